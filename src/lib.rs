//! HTTP Fetch Library
//!
//! This library fetches one or more URLs and pushes each response body
//! downstream, as text or raw bytes, once or on a cron schedule.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Request execution engine, options and their validation
//! - [`auth`] - HTTP Basic and OAuth2 password-grant credentials
//! - [`transport`] - Network boundary with a reqwest-backed implementation
//! - [`writer`] - Downstream sinks receiving the fetched bodies
//! - [`schedule`] - Cron-driven repetition of a run
//! - [`error`] - Error taxonomy shared by every module

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;
pub mod fetch;
pub mod schedule;
pub mod transport;
pub mod writer;

// Re-export commonly used types
pub use auth::{AuthConfig, Authenticator, HttpBasicAuth, OAuth2PasswordAuth};
pub use error::FetchError;
pub use fetch::{
    AcceptRules, DEFAULT_ACCEPT_STATUS_CODES, ExecutionConfig, FetchEngine, FetchOptions,
    TimedOut, accepts, parse_headers, with_timeout,
};
pub use schedule::{Operation, parse_cron, schedule};
pub use transport::{BodyStream, FetchResponse, HttpTransport, RequestSpec, Transport, TransportError};
pub use writer::{Chunk, ChannelReader, ChannelWriter, StdoutWriter, Writer, WriterError};
