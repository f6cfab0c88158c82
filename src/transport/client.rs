//! reqwest-backed transport.
//!
//! This module provides the `HttpTransport` struct which sends requests over
//! a shared connection pool and exposes response bodies as byte streams.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, Method};
use tracing::{debug, instrument};

use super::{FetchResponse, RequestSpec, Transport, TransportError};

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent for outbound requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{}/{version}", env!("CARGO_PKG_NAME"))
}

/// HTTP transport with connection pooling.
///
/// This transport is designed to be created once and shared by every request
/// of an engine, including OAuth2 token exchanges.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a transport with the default connect timeout.
    ///
    /// No overall request timeout is set here; deadlines are applied per
    /// request by the engine.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connect_timeout(CONNECT_TIMEOUT_SECS)
    }

    /// Creates a transport with an explicit connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_connect_timeout(connect_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Wraps a preconfigured reqwest client (proxies, TLS roots, headers).
    ///
    /// The client's own User-Agent and timeouts are used as configured.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn send(&self, request: &RequestSpec) -> Result<FetchResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(status, "response head received");

        let body = response_has_body(request.method(), status, &headers).then(|| {
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from))
                .boxed()
        });

        Ok(FetchResponse::new(status, headers, body))
    }
}

/// Decides whether a response carries a body at all.
///
/// HEAD responses, informational and null-body statuses (204, 205, 304), and
/// responses announcing `Content-Length: 0` have none.
fn response_has_body(method: &Method, status: u16, headers: &HeaderMap) -> bool {
    if method == Method::HEAD {
        return false;
    }
    if (100..200).contains(&status) || matches!(status, 204 | 205 | 304) {
        return false;
    }
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    declared_length != Some(0)
}
