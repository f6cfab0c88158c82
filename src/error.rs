//! Error types for request execution.
//!
//! A single taxonomy covers configuration failures (raised while the engine
//! is being built) and runtime failures (raised while a request executes).
//! Variants carry the context needed to act on them: the URL that failed,
//! the offending rule or header line, the rejected status code.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while configuring or running a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The response status matched none of the accept rules.
    #[error("status code {status} not accepted")]
    StatusCodeNotAccepted {
        /// The rejected HTTP status code.
        status: u16,
    },

    /// The response carried no body while `bodyCanBeEmpty` is false.
    #[error("no body in response")]
    NoBodyInResponse,

    /// An accept rule is neither an integer literal nor an `A-B` range.
    #[error("invalid status code range: '{rule}'")]
    InvalidStatusCodeRange {
        /// The rule that failed to parse.
        rule: String,
    },

    /// A header line is not of the form `key: value`.
    #[error("invalid headers: '{line}'")]
    InvalidHeaders {
        /// The offending header line.
        line: String,
    },

    /// The transport failed before a response arrived (DNS, refused connection, TLS).
    #[error("generic fetch error for {url}: {source}")]
    GenericFetch {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The supplied configuration is inconsistent or incomplete.
    #[error("{0}")]
    IllegalParameters(String),

    /// Reading the response body failed mid-stream.
    #[error("connection error while reading {url}: {source}")]
    Connection {
        /// The URL whose body was being read.
        url: String,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// No response arrived within the configured deadline.
    #[error("request exceeded time limit of {ms} ms")]
    TimeOut {
        /// The configured deadline in milliseconds.
        ms: u64,
    },

    /// The endpoint answered 401 and no credentials were sent, or no token was issued.
    #[error("unauthorized")]
    Unauthorized,

    /// The endpoint answered 401 although credentials were attached.
    #[error("credentials are invalid or have insufficient access")]
    CredentialIssue,

    /// The OAuth2 token endpoint answered with a non-success status.
    #[error(
        "an issue occurred while retrieving the OAuth2 token; response with status code {status}"
    )]
    OAuth2Token {
        /// Status returned by the token endpoint.
        status: u16,
    },

    /// The cron expression could not be parsed.
    #[error("the provided cron expression is invalid: '{expression}'")]
    InvalidCronExpression {
        /// The rejected expression.
        expression: String,
    },
}

impl FetchError {
    /// Creates an illegal-parameters error with a detail message.
    pub fn illegal_parameters(detail: impl Into<String>) -> Self {
        Self::IllegalParameters(detail.into())
    }

    /// Creates an invalid status code range error.
    pub fn invalid_status_code_range(rule: impl Into<String>) -> Self {
        Self::InvalidStatusCodeRange { rule: rule.into() }
    }

    /// Creates an invalid headers error.
    pub fn invalid_headers(line: impl Into<String>) -> Self {
        Self::InvalidHeaders { line: line.into() }
    }

    /// Creates a generic fetch error from a transport failure.
    pub fn generic_fetch(url: impl Into<String>, source: TransportError) -> Self {
        Self::GenericFetch {
            url: url.into(),
            source,
        }
    }

    /// Creates a connection error from a failed body read.
    pub fn connection(url: impl Into<String>, source: TransportError) -> Self {
        Self::Connection {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid cron expression error.
    pub fn invalid_cron_expression(expression: impl Into<String>) -> Self {
        Self::InvalidCronExpression {
            expression: expression.into(),
        }
    }

    /// Returns true for errors that can only arise while building the engine.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::IllegalParameters(_)
                | Self::InvalidHeaders { .. }
                | Self::InvalidStatusCodeRange { .. }
        )
    }
}
