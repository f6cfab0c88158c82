//! Credential strategies applied to outbound requests.
//!
//! An [`Authenticator`] attaches credentials to a request immediately before
//! it is sent, every time it is sent, so short-lived credentials never go
//! stale. The strategy is chosen once from an [`AuthConfig`]:
//!
//! - `basic` - [`HttpBasicAuth`], a static `Authorization: Basic` header
//! - `oauth2` - [`OAuth2PasswordAuth`], a fresh password-grant token per request
//!
//! No configuration means no authenticator: requests go out unauthenticated.

mod basic;
mod oauth2;

pub use basic::HttpBasicAuth;
pub use oauth2::OAuth2PasswordAuth;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FetchError;
use crate::transport::{RequestSpec, Transport};

/// Capability set shared by every credential strategy.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Attaches credentials to `request`, using `transport` for any exchange
    /// the strategy needs.
    async fn authorize(
        &self,
        transport: &dyn Transport,
        request: &mut RequestSpec,
    ) -> Result<(), FetchError>;

    /// Returns true if `request` carries credentials this strategy accepts.
    ///
    /// Used by test doubles standing in for a protected endpoint; the send
    /// path never calls it.
    fn check(&self, request: &RequestSpec) -> bool;
}

/// Authentication settings as supplied by the user.
///
/// `type` selects the strategy; the remaining fields are validated per
/// strategy when the authenticator is built.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Strategy tag: `basic` or `oauth2`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Account name.
    #[serde(default)]
    pub username: Option<String>,
    /// Account password.
    #[serde(default)]
    pub password: Option<String>,
    /// Token endpoint (OAuth2 only).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AuthConfig {
    /// HTTP Basic settings.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: "basic".to_string(),
            username: Some(username.into()),
            password: Some(password.into()),
            endpoint: None,
        }
    }

    /// OAuth2 password grant settings.
    #[must_use]
    pub fn oauth2(
        username: impl Into<String>,
        password: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            kind: "oauth2".to_string(),
            username: Some(username.into()),
            password: Some(password.into()),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Resolves the settings into a shared authenticator.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::IllegalParameters`] for an unknown `type` or a
    /// missing field required by the selected strategy.
    pub fn build(&self) -> Result<Arc<dyn Authenticator>, FetchError> {
        match self.kind.as_str() {
            "basic" => Ok(Arc::new(HttpBasicAuth::from_config(self)?)),
            "oauth2" => Ok(Arc::new(OAuth2PasswordAuth::from_config(self)?)),
            other => Err(FetchError::illegal_parameters(format!(
                "Unknown auth type: '{other}'"
            ))),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Returns the field's value if present and non-empty.
fn required<'a>(value: Option<&'a String>, message: &str) -> Result<&'a str, FetchError> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FetchError::illegal_parameters(message))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_basic() {
        let auth = AuthConfig::basic("admin", "password").build().unwrap();
        assert_eq!(auth.name(), "basic");
    }

    #[test]
    fn test_build_oauth2() {
        let auth = AuthConfig::oauth2("admin", "password", "http://localhost:8080/token")
            .build()
            .unwrap();
        assert_eq!(auth.name(), "oauth2");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let config = AuthConfig {
            kind: "invalid".to_string(),
            ..AuthConfig::basic("admin", "password")
        };
        let error = config.build().unwrap_err();
        assert!(matches!(error, FetchError::IllegalParameters(_)));
        assert_eq!(error.to_string(), "Unknown auth type: 'invalid'");
    }

    #[test]
    fn test_type_tag_is_case_sensitive() {
        let config = AuthConfig {
            kind: "Basic".to_string(),
            ..AuthConfig::basic("admin", "password")
        };
        assert_eq!(
            config.build().unwrap_err().to_string(),
            "Unknown auth type: 'Basic'"
        );
    }

    #[test]
    fn test_deserialize_from_tagged_object() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"type": "oauth2", "username": "u", "password": "p", "endpoint": "https://id.example/token"}"#,
        )
        .unwrap();
        assert_eq!(config.kind, "oauth2");
        assert_eq!(config.endpoint.as_deref(), Some("https://id.example/token"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", AuthConfig::basic("admin", "hunter2"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"), "leaked: {debug}");
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let config: AuthConfig = serde_json::from_str(r#"{"type": "basic"}"#).unwrap();
        assert!(config.username.is_none());
        assert!(config.build().is_err());
    }
}
