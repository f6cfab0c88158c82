//! Integration tests for OAuth2 password-grant authentication.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use http_fetch::writer::DEFAULT_CHANNEL_CAPACITY;
use http_fetch::{AuthConfig, ChannelWriter, FetchEngine, FetchError, FetchOptions};
use tokio::task::JoinHandle;
mod support;
use support::socket_guard::start_mock_server_or_skip;

const GRANT_BODY: &str = "grant_type=password&username=admin&password=password";

/// Builds an OAuth2 engine for `/secure` whose output is drained in the background.
fn oauth_engine(mock_server: &MockServer, options: FetchOptions) -> (FetchEngine, JoinHandle<String>) {
    let (writer, reader) = ChannelWriter::new(DEFAULT_CHANNEL_CAPACITY);
    let options = FetchOptions {
        auth: Some(AuthConfig::oauth2(
            "admin",
            "password",
            format!("{}/token", mock_server.uri()),
        )),
        ..options
    };
    let engine = FetchEngine::new(
        [format!("{}/secure", mock_server.uri())],
        options,
        Arc::new(writer),
    )
    .unwrap();
    (engine, tokio::spawn(reader.collect_string()))
}

async fn mount_protected_resource(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .with_priority(1)
        .mount(mock_server)
        .await;
    Mock::given(path("/secure"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(2)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_oauth2_token_is_exchanged_and_attached() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(GRANT_BODY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "abc123", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_protected_resource(&mock_server).await;

    let (engine, output) = oauth_engine(&mock_server, FetchOptions::default());
    engine.produce().await.unwrap();

    assert_eq!(output.await.unwrap(), "Welcome");
}

#[tokio::test]
async fn test_oauth2_exchanges_a_token_for_every_send() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc123"})))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_protected_resource(&mock_server).await;

    let options = FetchOptions {
        close_on_end: Some(false),
        ..FetchOptions::default()
    };
    let (engine, _output) = oauth_engine(&mock_server, options);
    for _ in 0..3 {
        engine.produce().await.unwrap();
    }
}

#[tokio::test]
async fn test_oauth2_rejected_grant_reports_status() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&mock_server)
        .await;
    Mock::given(path("/secure"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (engine, _output) = oauth_engine(&mock_server, FetchOptions::default());
    let error = engine.produce().await.unwrap_err();

    assert!(matches!(error, FetchError::OAuth2Token { status: 400 }));
}

#[tokio::test]
async fn test_oauth2_missing_access_token_is_unauthorized() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&mock_server)
        .await;

    let (engine, _output) = oauth_engine(&mock_server, FetchOptions::default());
    let error = engine.produce().await.unwrap_err();

    assert!(matches!(error, FetchError::Unauthorized));
}

#[tokio::test]
async fn test_oauth2_token_rejected_by_resource_is_credential_issue() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "stale"})))
        .mount(&mock_server)
        .await;
    mount_protected_resource(&mock_server).await;

    let (engine, _output) = oauth_engine(&mock_server, FetchOptions::default());
    let error = engine.produce().await.unwrap_err();

    assert!(matches!(error, FetchError::CredentialIssue));
}

#[tokio::test]
async fn test_oauth2_failure_is_isolated_when_non_fatal() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let options = FetchOptions {
        errors_are_fatal: false,
        ..FetchOptions::default()
    };
    let (engine, output) = oauth_engine(&mock_server, options);
    engine.produce().await.unwrap();

    assert_eq!(output.await.unwrap(), "");
}

#[test]
fn test_incomplete_oauth2_config_is_rejected_at_construction() {
    let (writer, _reader) = ChannelWriter::new(1);
    let options = FetchOptions {
        auth: Some(AuthConfig {
            endpoint: None,
            ..AuthConfig::oauth2("admin", "password", "http://localhost/token")
        }),
        ..FetchOptions::default()
    };

    let error = FetchEngine::new(["http://localhost/secure"], options, Arc::new(writer)).unwrap_err();

    assert_eq!(
        error.to_string(),
        "Endpoint is required for OAuth2 Password Grant."
    );
}
