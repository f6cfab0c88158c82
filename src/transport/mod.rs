//! Network boundary for the fetch engine.
//!
//! The engine never talks to the network directly: it hands a [`RequestSpec`]
//! to a [`Transport`] and receives a [`FetchResponse`] whose body, when
//! present, is a stream of byte chunks. [`HttpTransport`] is the production
//! implementation; tests inject their own.

mod client;

pub use client::HttpTransport;

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Errors raised by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error reported by the reqwest client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Error reported by any other transport implementation.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps an arbitrary error (or message) raised by a custom transport.
    pub fn custom(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Custom(error.into())
    }
}

/// Description of one outbound call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestSpec {
    /// Creates a request without a body.
    #[must_use]
    pub fn new(url: Url, method: Method, headers: HeaderMap) -> Self {
        Self {
            url,
            method,
            headers,
            body: None,
        }
    }

    /// Attaches a request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Sets `name`, replacing every existing value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }
}

/// Response handed back by a [`Transport`].
pub struct FetchResponse {
    status: u16,
    headers: HeaderMap,
    body: Option<BodyStream>,
}

impl FetchResponse {
    /// Creates a response from its parts. `body` is `None` when the response carries no body.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: Option<BodyStream>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response whose body is delivered as a single chunk.
    #[must_use]
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let chunk: Result<Bytes, TransportError> = Ok(body.into());
        Self::new(status, HeaderMap::new(), Some(stream::iter([chunk]).boxed()))
    }

    /// Creates a response without a body.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderMap::new(), None)
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns true if the response carries a body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Consumes the response, returning its body stream.
    #[must_use]
    pub fn into_body(self) -> Option<BodyStream> {
        self.body
    }

    /// Reads the whole body into memory. A missing body yields an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`] raised while reading.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let Some(mut body) = self.body else {
            return Ok(Bytes::new());
        };

        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Executes requests on behalf of the engine and the authenticators.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns once the response head has arrived.
    async fn send(&self, request: &RequestSpec) -> Result<FetchResponse, TransportError>;
}
