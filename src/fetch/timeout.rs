//! Optional deadline around an in-flight operation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Signal returned when the deadline fired before the operation completed.
///
/// Distinct from any error the operation itself can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {ms} ms")]
pub struct TimedOut {
    /// The deadline that elapsed, in milliseconds.
    pub ms: u64,
}

/// Runs `operation`, racing it against a timer of `ms` milliseconds when given.
///
/// Without a deadline the operation runs unmodified. When the timer wins the
/// operation is dropped, which cancels whatever it had in flight; the timer is
/// dropped with the race in either case.
///
/// # Errors
///
/// Returns [`TimedOut`] if the deadline elapsed first.
pub async fn with_timeout<F>(ms: Option<u64>, operation: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    let Some(ms) = ms else {
        return Ok(operation.await);
    };

    tokio::time::timeout(Duration::from_millis(ms), operation)
        .await
        .map_err(|_| TimedOut { ms })
}
