//! OAuth2 Resource-Owner-Password-Credentials grant.
//!
//! Every call to `authorize` performs a full token exchange. Tokens are not
//! cached, so a request never carries a token that expired between cycles.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{AuthConfig, Authenticator, required};
use crate::error::FetchError;
use crate::transport::{RequestSpec, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Subset of the token endpoint's JSON answer.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchanges a username and password for a bearer token before every request.
#[derive(Debug, Clone)]
pub struct OAuth2PasswordAuth {
    username: String,
    password: SecretString,
    endpoint: Url,
}

impl OAuth2PasswordAuth {
    /// Creates the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::IllegalParameters`] if a value is empty or the
    /// endpoint is not a valid URL.
    pub fn new(username: &str, password: &str, endpoint: &str) -> Result<Self, FetchError> {
        if username.is_empty() {
            return Err(FetchError::illegal_parameters(
                "Username is required for OAuth2 Password Grant.",
            ));
        }
        if password.is_empty() {
            return Err(FetchError::illegal_parameters(
                "Password is required for OAuth2 Password Grant.",
            ));
        }
        if endpoint.is_empty() {
            return Err(FetchError::illegal_parameters(
                "Endpoint is required for OAuth2 Password Grant.",
            ));
        }
        let endpoint = Url::parse(endpoint).map_err(|e| {
            FetchError::illegal_parameters(format!(
                "Invalid OAuth2 token endpoint '{endpoint}': {e}"
            ))
        })?;

        Ok(Self {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            endpoint,
        })
    }

    pub(super) fn from_config(config: &AuthConfig) -> Result<Self, FetchError> {
        let username = required(
            config.username.as_ref(),
            "Username is required for OAuth2 Password Grant.",
        )?;
        let password = required(
            config.password.as_ref(),
            "Password is required for OAuth2 Password Grant.",
        )?;
        let endpoint = required(
            config.endpoint.as_ref(),
            "Endpoint is required for OAuth2 Password Grant.",
        )?;
        Self::new(username, password, endpoint)
    }

    fn token_request(&self) -> RequestSpec {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", &self.username)
            .append_pair("password", self.password.expose_secret())
            .finish();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        RequestSpec::new(self.endpoint.clone(), Method::POST, headers).with_body(body)
    }
}

#[async_trait]
impl Authenticator for OAuth2PasswordAuth {
    fn name(&self) -> &'static str {
        "oauth2"
    }

    #[instrument(level = "debug", skip(self, transport, request), fields(auth = "oauth2", endpoint = %self.endpoint, url = %request.url()))]
    async fn authorize(
        &self,
        transport: &dyn Transport,
        request: &mut RequestSpec,
    ) -> Result<(), FetchError> {
        let endpoint = self.endpoint.as_str();
        let response = transport
            .send(&self.token_request())
            .await
            .map_err(|e| FetchError::generic_fetch(endpoint, e))?;

        if !response.is_success() {
            return Err(FetchError::OAuth2Token {
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::connection(endpoint, e))?;
        let token = match serde_json::from_slice::<TokenResponse>(&body) {
            Ok(parsed) => parsed.access_token.filter(|t| !t.is_empty()),
            Err(e) => {
                debug!(error = %e, "token endpoint returned unparsable JSON");
                None
            }
        };
        let Some(token) = token else {
            return Err(FetchError::Unauthorized);
        };

        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| FetchError::Unauthorized)?;
        header.set_sensitive(true);
        request.set_header(AUTHORIZATION, header);
        debug!("bearer token attached");
        Ok(())
    }

    /// Accepts any request carrying a non-empty bearer token; the token's
    /// validity can only be judged by the issuer.
    fn check(&self, request: &RequestSpec) -> bool {
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| !token.trim().is_empty())
    }
}
