//! Cron-driven repetition of an async operation.
//!
//! [`schedule`] wraps an [`Operation`] so that invoking the wrapper arms a
//! recurring job instead of running the operation once. The job runs on the
//! tokio runtime until the runtime shuts down. Fire times follow the host's
//! local time zone, so `0 9 * * *` fires at 09:00 wall-clock time.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, error, info};

use crate::error::FetchError;

/// A cloneable, zero-argument async operation.
pub type Operation = Arc<dyn Fn() -> BoxFuture<'static, Result<(), FetchError>> + Send + Sync>;

/// Builds an [`Operation`] from an async closure.
pub fn operation<F, Fut>(f: F) -> Operation
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), FetchError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Parses a cron expression.
///
/// Six or seven fields (with seconds, optional year) are taken as is. A
/// classic five-field expression fires at second zero.
///
/// # Errors
///
/// Returns [`FetchError::InvalidCronExpression`] if the expression does not parse.
pub fn parse_cron(expression: &str) -> Result<Schedule, FetchError> {
    let trimmed = expression.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| {
        debug!(expression, error = %e, "cron expression rejected");
        FetchError::invalid_cron_expression(expression)
    })
}

/// Wraps `op` so that invoking the result arms a recurring job.
///
/// The expression is only parsed when the returned operation is invoked; an
/// invalid expression fails that invocation. Ticks run one at a time, and a
/// tick that overruns the next fire time skips it. Tick errors are logged and
/// do not stop the job. With `run_on_init`, `op` also runs once right away.
pub fn schedule(op: Operation, cron_expr: impl Into<String>, run_on_init: bool) -> Operation {
    let expression: Arc<str> = Arc::from(cron_expr.into());

    Arc::new(move || {
        let op = Arc::clone(&op);
        let expression = Arc::clone(&expression);
        async move {
            let schedule = parse_cron(&expression)?;

            if run_on_init {
                let initial = Arc::clone(&op);
                tokio::spawn(async move {
                    if let Err(e) = initial().await {
                        error!(error = %e, "initial run failed");
                    }
                });
            }

            info!(cron = %expression, "schedule armed");
            tokio::spawn(run_schedule(schedule, op, expression));
            Ok(())
        }
        .boxed()
    })
}

/// Next fire time strictly after `from`, in local time.
fn next_fire(schedule: &Schedule, from: &DateTime<Local>) -> Option<DateTime<Local>> {
    schedule.after(from).next()
}

async fn run_schedule(schedule: Schedule, op: Operation, expression: Arc<str>) {
    let mut last_fire = Local::now();
    loop {
        // Fire times that passed while the previous tick ran are skipped.
        let from = last_fire.max(Local::now());
        let Some(next) = next_fire(&schedule, &from) else {
            info!(cron = %expression, "schedule has no further fire times");
            return;
        };
        let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;
        last_fire = next;

        debug!(cron = %expression, at = %next, "tick");
        if let Err(e) = op().await {
            error!(cron = %expression, error = %e, "scheduled run failed");
        }
    }
}
