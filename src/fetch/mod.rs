//! Fetching URLs and forwarding their bodies.
//!
//! This module contains the [`FetchEngine`] and the building blocks it runs
//! on: option validation, status accept rules, header parsing and the
//! per-request deadline.

mod config;
mod decode;
mod engine;
mod headers;
mod status;
mod timeout;

pub use config::{ExecutionConfig, FetchOptions};
pub use engine::FetchEngine;
pub use headers::parse_headers;
pub use status::{AcceptRules, DEFAULT_ACCEPT_STATUS_CODES, StatusRule, accepts};
pub use timeout::{TimedOut, with_timeout};
