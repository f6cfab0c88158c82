//! HTTP Basic authentication.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::instrument;

use super::{AuthConfig, Authenticator, required};
use crate::error::FetchError;
use crate::transport::{RequestSpec, Transport};

/// Attaches `Authorization: Basic base64(username:password)` to every request.
///
/// The header value is computed once and flagged sensitive, so it never shows
/// up in `Debug` output.
#[derive(Debug, Clone)]
pub struct HttpBasicAuth {
    header: HeaderValue,
}

impl HttpBasicAuth {
    /// Creates the strategy from a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::IllegalParameters`] if either value is empty.
    pub fn new(username: &str, password: &str) -> Result<Self, FetchError> {
        if username.is_empty() {
            return Err(FetchError::illegal_parameters(
                "Username is required for HTTP Basic Auth.",
            ));
        }
        if password.is_empty() {
            return Err(FetchError::illegal_parameters(
                "Password is required for HTTP Basic Auth.",
            ));
        }

        let encoded = STANDARD.encode(format!("{username}:{password}"));
        let mut header = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|_| FetchError::illegal_parameters("Invalid HTTP Basic Auth credentials."))?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    pub(super) fn from_config(config: &AuthConfig) -> Result<Self, FetchError> {
        let username = required(
            config.username.as_ref(),
            "Username is required for HTTP Basic Auth.",
        )?;
        let password = required(
            config.password.as_ref(),
            "Password is required for HTTP Basic Auth.",
        )?;
        Self::new(username, password)
    }
}

#[async_trait]
impl Authenticator for HttpBasicAuth {
    fn name(&self) -> &'static str {
        "basic"
    }

    #[instrument(level = "debug", skip(self, _transport, request), fields(auth = "basic", url = %request.url()))]
    async fn authorize(
        &self,
        _transport: &dyn Transport,
        request: &mut RequestSpec,
    ) -> Result<(), FetchError> {
        request.set_header(AUTHORIZATION, self.header.clone());
        Ok(())
    }

    fn check(&self, request: &RequestSpec) -> bool {
        request.headers().get(AUTHORIZATION) == Some(&self.header)
    }
}
