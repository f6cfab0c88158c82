//! Fetch options and their validated form.
//!
//! [`FetchOptions`] is the user-facing shape: every field optional, camelCase
//! when read from JSON. [`ExecutionConfig`] is what the engine runs on, built
//! once by [`ExecutionConfig::new`], which rejects every inconsistent
//! combination before a single request is sent.

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::headers::parse_headers;
use super::status::{AcceptRules, DEFAULT_ACCEPT_STATUS_CODES};
use crate::auth::AuthConfig;
use crate::error::FetchError;

/// Options controlling how URLs are fetched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// HTTP method token.
    pub method: String,
    /// Request headers as `"key: value"` lines.
    pub headers: Vec<String>,
    /// Accepted status rules; empty means the default `["200-300"]`.
    pub accept_status_codes: Vec<String>,
    /// Close the writer once a run completes. Unset means true, or false with `cron`.
    pub close_on_end: Option<bool>,
    /// Treat a missing body as success.
    pub body_can_be_empty: bool,
    /// Per-request deadline in milliseconds.
    #[serde(alias = "timeOutMilliseconds")]
    pub timeout_milliseconds: Option<u64>,
    /// Credentials to attach to every request.
    pub auth: Option<AuthConfig>,
    /// Cron expression driving repeated runs.
    pub cron: Option<String>,
    /// With `cron`, also run once right away.
    pub run_on_init: bool,
    /// Abort the run on the first failed request.
    pub errors_are_fatal: bool,
    /// Forward bodies as raw bytes instead of text.
    pub output_as_buffer: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: Vec::new(),
            accept_status_codes: Vec::new(),
            close_on_end: None,
            body_can_be_empty: false,
            timeout_milliseconds: None,
            auth: None,
            cron: None,
            run_on_init: false,
            errors_are_fatal: true,
            output_as_buffer: false,
        }
    }
}

/// Validated, immutable execution settings.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    method: Method,
    headers: HeaderMap,
    accept_rules: AcceptRules,
    close_on_end: bool,
    body_can_be_empty: bool,
    timeout_ms: Option<u64>,
    auth: Option<AuthConfig>,
    cron: Option<String>,
    run_on_init: bool,
    errors_are_fatal: bool,
    output_as_buffer: bool,
}

impl ExecutionConfig {
    /// Validates `options`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::IllegalParameters`] for a HEAD request that may not
    ///   have an empty body, `closeOnEnd` combined with `cron`, a zero
    ///   timeout, or an invalid method token.
    /// - [`FetchError::InvalidStatusCodeRange`] for a malformed accept rule.
    /// - [`FetchError::InvalidHeaders`] for a malformed header line.
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let method_name = options.method.trim();
        if method_name.eq_ignore_ascii_case("HEAD") && !options.body_can_be_empty {
            return Err(FetchError::illegal_parameters(
                "Cannot use HEAD method with bodyCanBeEmpty set to false",
            ));
        }

        let close_on_end = match (options.cron.is_some(), options.close_on_end) {
            (true, Some(true)) => {
                return Err(FetchError::illegal_parameters(
                    "Cannot close stream when using cron.",
                ));
            }
            (true, _) => false,
            (false, close) => close.unwrap_or(true),
        };

        if options.timeout_milliseconds == Some(0) {
            return Err(FetchError::illegal_parameters(
                "timeoutMilliseconds must be a positive number of milliseconds",
            ));
        }

        let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                FetchError::illegal_parameters(format!("Invalid HTTP method: '{}'", options.method))
            })?;

        let accept_rules = if options.accept_status_codes.is_empty() {
            AcceptRules::parse(DEFAULT_ACCEPT_STATUS_CODES)?
        } else {
            AcceptRules::parse(&options.accept_status_codes)?
        };
        let headers = parse_headers(&options.headers)?;

        Ok(Self {
            method,
            headers,
            accept_rules,
            close_on_end,
            body_can_be_empty: options.body_can_be_empty,
            timeout_ms: options.timeout_milliseconds,
            auth: options.auth,
            cron: options.cron,
            run_on_init: options.run_on_init,
            errors_are_fatal: options.errors_are_fatal,
            output_as_buffer: options.output_as_buffer,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn accept_rules(&self) -> &AcceptRules {
        &self.accept_rules
    }

    /// Whether the writer is closed at the end of a run.
    #[must_use]
    pub fn close_on_end(&self) -> bool {
        self.close_on_end
    }

    #[must_use]
    pub fn body_can_be_empty(&self) -> bool {
        self.body_can_be_empty
    }

    /// Per-request deadline in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    #[must_use]
    pub fn auth(&self) -> Option<&AuthConfig> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn cron(&self) -> Option<&str> {
        self.cron.as_deref()
    }

    #[must_use]
    pub fn run_on_init(&self) -> bool {
        self.run_on_init
    }

    #[must_use]
    pub fn errors_are_fatal(&self) -> bool {
        self.errors_are_fatal
    }

    #[must_use]
    pub fn output_as_buffer(&self) -> bool {
        self.output_as_buffer
    }
}
