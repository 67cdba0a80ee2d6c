#![allow(clippy::unwrap_used)]
// Integration tests for `Session` login/logout using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smc_api::{
    ApiVersion, Credential, Error, Href, RetryPolicy, SESSION_HEADER, Session, SessionConfig,
    clear_default_session, default_session, set_default_session,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> SessionConfig {
    let mut config = SessionConfig::new(Url::parse(&server.uri()).unwrap());
    config.transport.retry = RetryPolicy {
        max_retries: 1,
        backoff: Duration::from_millis(1),
    };
    config
}

fn credential() -> Credential {
    Credential::new("api-key-123".to_string())
}

async fn mount_versions(server: &MockServer, versions: &[&str]) {
    let list: Vec<_> = versions
        .iter()
        .map(|v| json!({ "rel": v, "href": format!("{}/{v}/api", server.uri()) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": list })))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, version: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/{version}/login")))
        .respond_with(ResponseTemplate::new(200).insert_header(SESSION_HEADER, "tok-1"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{version}/api")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entry_point": [
                { "rel": "host", "href": format!("{}/{version}/elements/host", server.uri()) },
                { "rel": "network", "href": format!("{}/{version}/elements/network", server.uri()) }
            ]
        })))
        .mount(server)
        .await;
}

// ── Version negotiation ─────────────────────────────────────────────

#[tokio::test]
async fn login_negotiates_highest_common_version() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.1", "6.2", "6.3", "6.4", "6.5"]).await;
    mount_login(&server, "6.5").await;

    let session = Session::new(config(&server)).unwrap();
    let version = session.login(&credential()).await.unwrap();

    assert_eq!(version, ApiVersion::new(6, 5));
    assert!(session.is_logged_in());
    assert_eq!(
        session.entry_point("host").unwrap(),
        Href::new(format!("{}/6.5/elements/host", server.uri()))
    );
    assert_eq!(session.entry_point_names().unwrap(), vec!["host", "network"]);
}

#[tokio::test]
async fn login_skips_versions_the_client_does_not_know() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.4", "7.2"]).await;
    mount_login(&server, "6.4").await;

    let session = Session::new(config(&server)).unwrap();
    assert_eq!(
        session.login(&credential()).await.unwrap(),
        ApiVersion::new(6, 4)
    );
}

#[tokio::test]
async fn login_fails_on_version_mismatch() {
    let server = MockServer::start().await;
    mount_versions(&server, &["5.0"]).await;

    let session = Session::new(config(&server)).unwrap();
    let result = session.login(&credential()).await;

    assert!(
        matches!(result, Err(Error::VersionMismatch { .. })),
        "expected VersionMismatch, got: {result:?}"
    );
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn pinned_version_must_be_offered() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;

    let mut config = config(&server);
    config.api_version = Some(ApiVersion::new(6, 2));
    let session = Session::new(config).unwrap();

    assert!(matches!(
        session.login(&credential()).await,
        Err(Error::VersionMismatch { .. })
    ));
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn login_sends_key_and_domain() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    Mock::given(method("POST"))
        .and(path("/6.5/login"))
        .and(body_json(json!({ "authenticationkey": "api-key-123", "domain": "Branch" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/6.5/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entry_point": [] })))
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    session
        .login(&credential().with_domain("Branch"))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_failure_is_authentication_error() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    Mock::given(method("POST"))
        .and(path("/6.5/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid authentication key"))
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    match session.login(&credential()).await {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("Invalid authentication key"), "got: {message}");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn session_token_is_sent_on_requests() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    mount_login(&server, "6.5").await;
    Mock::given(method("GET"))
        .and(path("/6.5/elements/host/1"))
        .and(header(SESSION_HEADER, "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "h1" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    session.login(&credential()).await.unwrap();

    let href = Href::new(format!("{}/6.5/elements/host/1", server.uri()));
    let result = session.read(&href).await.unwrap();
    assert!(result.success);
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_login_fail() {
    let server = MockServer::start().await;
    let session = Session::new(config(&server)).unwrap();

    let href = Href::new(format!("{}/6.5/elements/host/1", server.uri()));
    assert!(matches!(session.read(&href).await, Err(Error::NotLoggedIn)));
    assert!(matches!(session.entry_point("host"), Err(Error::NotLoggedIn)));
    assert!(matches!(session.logout().await, Err(Error::NotLoggedIn)));
}

#[tokio::test]
async fn logout_clears_local_state_even_when_rejected() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    mount_login(&server, "6.5").await;
    Mock::given(method("PUT"))
        .and(path("/6.5/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    session.login(&credential()).await.unwrap();
    session.logout().await.unwrap();

    assert!(!session.is_logged_in());
    assert_eq!(session.api_version(), None);
}

#[tokio::test]
async fn unknown_entry_point_is_reported() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    mount_login(&server, "6.5").await;

    let session = Session::new(config(&server)).unwrap();
    session.login(&credential()).await.unwrap();

    assert!(matches!(
        session.entry_point("vpn_profile"),
        Err(Error::UnsupportedEntryPoint(ref kind)) if kind == "vpn_profile"
    ));
}

#[tokio::test]
async fn default_session_slot() {
    let server = MockServer::start().await;
    mount_versions(&server, &["6.5"]).await;
    mount_login(&server, "6.5").await;

    clear_default_session();
    assert!(matches!(default_session(), Err(Error::NotLoggedIn)));

    let session = Session::connect(config(&server), &credential()).await.unwrap();
    set_default_session(Arc::clone(&session));
    assert!(Arc::ptr_eq(&default_session().unwrap(), &session));

    clear_default_session();
    assert!(matches!(default_session(), Err(Error::NotLoggedIn)));
}
