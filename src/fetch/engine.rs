//! Request execution engine.
//!
//! This module provides the `FetchEngine`, which fetches a fixed set of URLs
//! and forwards each response body to a [`Writer`].
//!
//! # Overview
//!
//! One run (a *cycle*) sends every configured request concurrently on the
//! calling task, waits for all of them to settle, optionally closes the
//! writer, and then reports the first fatal failure. Each request goes
//! through the same steps:
//!
//! 1. authorize a copy of the stored request, if credentials are configured
//! 2. send it through the [`Transport`], racing the optional deadline
//! 3. check the status against the accept rules
//! 4. stream the body downstream, or handle its absence
//!
//! With a cron expression configured, [`FetchEngine::produce`] arms a
//! schedule that repeats the cycle instead of running it once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http_fetch::writer::DEFAULT_CHANNEL_CAPACITY;
//! use http_fetch::{ChannelWriter, FetchEngine, FetchOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (writer, reader) = ChannelWriter::new(DEFAULT_CHANNEL_CAPACITY);
//! let engine = FetchEngine::new(
//!     ["https://example.org/data.ttl"],
//!     FetchOptions::default(),
//!     Arc::new(writer),
//! )?;
//!
//! // The channel is bounded: drain it while the engine runs.
//! let body = tokio::spawn(reader.collect_string());
//! engine.produce().await?;
//! println!("{}", body.await?);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::config::{ExecutionConfig, FetchOptions};
use super::decode::Utf8Carry;
use super::timeout::{TimedOut, with_timeout};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::FetchError;
use crate::schedule::{Operation, operation, schedule};
use crate::transport::{BodyStream, HttpTransport, RequestSpec, Transport};
use crate::writer::{Chunk, Writer};

/// Fetches a fixed set of URLs and forwards their bodies to a writer.
///
/// Cloning is cheap: clones share the same configuration, transport and
/// writer.
#[derive(Clone)]
pub struct FetchEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ExecutionConfig,
    requests: Vec<RequestSpec>,
    auth: Option<Arc<dyn Authenticator>>,
    transport: Arc<dyn Transport>,
    writer: Arc<dyn Writer>,
}

impl fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<&str> = self.inner.requests.iter().map(|r| r.url().as_str()).collect();
        f.debug_struct("FetchEngine")
            .field("urls", &urls)
            .field("config", &self.inner.config)
            .field("auth", &self.inner.auth)
            .field("transport", &self.inner.transport)
            .finish_non_exhaustive()
    }
}

impl FetchEngine {
    /// Creates an engine that sends requests with a default [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error ([`FetchError::is_configuration`]) if
    /// the options are inconsistent, no URL is given, a URL does not parse,
    /// or the auth settings are incomplete.
    pub fn new<I, S>(
        urls: I,
        options: FetchOptions,
        writer: Arc<dyn Writer>,
    ) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_transport(urls, options, writer, Arc::new(HttpTransport::new()))
    }

    /// Creates an engine that sends every request, token exchanges included,
    /// through `transport`.
    ///
    /// # Errors
    ///
    /// Same as [`FetchEngine::new`].
    pub fn with_transport<I, S>(
        urls: I,
        options: FetchOptions,
        writer: Arc<dyn Writer>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = ExecutionConfig::new(options)?;

        let requests = urls
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Url::parse(raw.trim())
                    .map(|url| {
                        RequestSpec::new(url, config.method().clone(), config.headers().clone())
                    })
                    .map_err(|e| {
                        FetchError::illegal_parameters(format!("Invalid URL '{raw}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if requests.is_empty() {
            return Err(FetchError::illegal_parameters(
                "At least one URL is required.",
            ));
        }

        let auth = config.auth().map(AuthConfig::build).transpose()?;

        debug!(
            urls = requests.len(),
            method = %config.method(),
            auth = auth.as_ref().map_or("none", |a| a.name()),
            cron = config.cron().unwrap_or("-"),
            "fetch engine configured"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                requests,
                auth,
                transport,
                writer,
            }),
        })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.inner.config
    }

    /// The stored requests, one per URL, in configuration order.
    #[must_use]
    pub fn requests(&self) -> &[RequestSpec] {
        &self.inner.requests
    }

    /// Runs the engine.
    ///
    /// Without cron this is one cycle. With cron it arms the schedule and
    /// resolves as soon as the schedule is running.
    ///
    /// # Errors
    ///
    /// Returns the first fatal request failure in URL order, or
    /// [`FetchError::InvalidCronExpression`] if the schedule cannot be armed.
    pub async fn produce(&self) -> Result<(), FetchError> {
        (self.operation())().await
    }

    /// Returns the run operation without invoking it.
    #[must_use]
    pub fn operation(&self) -> Operation {
        let engine = self.clone();
        let cycle = operation(move || {
            let engine = engine.clone();
            async move { engine.run_cycle().await }
        });

        match self.inner.config.cron() {
            Some(expression) => schedule(cycle, expression, self.inner.config.run_on_init()),
            None => cycle,
        }
    }

    #[instrument(skip(self), fields(urls = self.inner.requests.len()))]
    async fn run_cycle(&self) -> Result<(), FetchError> {
        let config = &self.inner.config;
        let results = join_all(self.inner.requests.iter().map(|r| self.execute_one(r))).await;

        let mut first_fatal = None;
        let mut failed = 0_usize;
        for (request, result) in self.inner.requests.iter().zip(results) {
            let Err(e) = result else {
                continue;
            };
            failed += 1;
            if config.errors_are_fatal() && first_fatal.is_none() {
                first_fatal = Some(e);
            } else {
                warn!(url = %request.url(), error = %e, "request failed");
            }
        }

        if config.close_on_end() {
            self.close_writer().await;
        }

        info!(
            requests = self.inner.requests.len(),
            failed, "fetch cycle complete"
        );
        first_fatal.map_or(Ok(()), Err)
    }

    /// Executes one request and forwards its body.
    ///
    /// The stored request is never modified; credentials are attached to a copy.
    ///
    /// # Errors
    ///
    /// - authorization failures, unchanged
    /// - [`FetchError::GenericFetch`] if the transport fails
    /// - [`FetchError::TimeOut`] if the deadline elapses before the response
    /// - [`FetchError::CredentialIssue`], [`FetchError::Unauthorized`] or
    ///   [`FetchError::StatusCodeNotAccepted`] for a rejected status
    /// - [`FetchError::NoBodyInResponse`] for a missing body that is not allowed
    /// - [`FetchError::Connection`] if reading the body fails
    #[instrument(skip(self, request), fields(url = %request.url(), method = %request.method()))]
    pub async fn execute_one(&self, request: &RequestSpec) -> Result<(), FetchError> {
        let inner = &self.inner;
        let config = &inner.config;
        let url = request.url().as_str();

        let mut outbound = request.clone();
        if let Some(auth) = &inner.auth {
            debug!(auth = auth.name(), "authorizing request");
            auth.authorize(inner.transport.as_ref(), &mut outbound)
                .await?;
        }

        debug!("sending request");
        let response = with_timeout(config.timeout_ms(), inner.transport.send(&outbound))
            .await
            .map_err(|TimedOut { ms }| FetchError::TimeOut { ms })?
            .map_err(|e| FetchError::generic_fetch(url, e))?;

        let status = response.status();
        debug!(status, "response received");
        if !config.accept_rules().accepts(status) {
            return Err(match (status, inner.auth.is_some()) {
                (401, true) => FetchError::CredentialIssue,
                (401, false) => FetchError::Unauthorized,
                _ => FetchError::StatusCodeNotAccepted { status },
            });
        }

        let Some(body) = response.into_body() else {
            if !config.body_can_be_empty() {
                return Err(FetchError::NoBodyInResponse);
            }
            debug!("response has no body");
            if config.cron().is_none() && config.close_on_end() {
                self.close_writer().await;
            }
            return Ok(());
        };

        if config.output_as_buffer() {
            self.forward_binary(url, body).await
        } else {
            self.forward_text(url, body).await
        }
    }

    async fn forward_text(&self, url: &str, mut body: BodyStream) -> Result<(), FetchError> {
        let mut carry = Utf8Carry::default();
        let mut chunks = 0_usize;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FetchError::connection(url, e))?;
            let text = carry.decode(&chunk);
            if text.is_empty() {
                continue;
            }
            if !self.push(url, Chunk::Text(text)).await {
                return Ok(());
            }
            chunks += 1;
        }

        let rest = carry.finish();
        if !rest.is_empty() && self.push(url, Chunk::Text(rest)).await {
            chunks += 1;
        }
        debug!(chunks, "body forwarded");
        Ok(())
    }

    async fn forward_binary(&self, url: &str, mut body: BodyStream) -> Result<(), FetchError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk.map_err(|e| FetchError::connection(url, e))?);
        }

        let bytes = buffer.len();
        if self.push(url, Chunk::Binary(buffer.freeze())).await {
            debug!(bytes, "body forwarded");
        }
        Ok(())
    }

    /// Pushes one chunk, returning false if the writer refused it.
    async fn push(&self, url: &str, chunk: Chunk) -> bool {
        match self.inner.writer.push(chunk).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url, error = %e, "writer rejected chunk, dropping rest of body");
                false
            }
        }
    }

    async fn close_writer(&self) {
        match self.inner.writer.close().await {
            Ok(()) => debug!("writer closed"),
            Err(e) => warn!(error = %e, "failed to close writer"),
        }
    }
}
