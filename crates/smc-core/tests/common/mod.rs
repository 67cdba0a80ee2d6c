#![allow(clippy::unwrap_used, dead_code)]
// Shared wiremock fixture: a logged-in 6.5 session with a few entry points.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smc_api::{Credential, Href, RetryPolicy, Session, SessionConfig};

pub const ENTRY_POINTS: &[&str] = &["host", "network", "group", "router"];

pub async fn setup() -> (MockServer, Arc<Session>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": [{ "rel": "6.5", "href": format!("{}/6.5/api", server.uri()) }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/6.5/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut entry_points: Vec<_> = ENTRY_POINTS
        .iter()
        .map(|rel| json!({ "rel": rel, "href": format!("{}/6.5/elements/{rel}", server.uri()) }))
        .collect();
    entry_points.push(json!({ "rel": "elements", "href": format!("{}/6.5/elements", server.uri()) }));
    Mock::given(method("GET"))
        .and(path("/6.5/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entry_point": entry_points })))
        .mount(&server)
        .await;

    let mut config = SessionConfig::new(Url::parse(&server.uri()).unwrap());
    config.transport.retry = RetryPolicy {
        max_retries: 1,
        backoff: Duration::from_millis(1),
    };
    let session = Session::connect(config, &Credential::new("key".to_string()))
        .await
        .unwrap();
    (server, session)
}

pub fn href(server: &MockServer, suffix: &str) -> Href {
    Href::new(format!("{}/6.5/{suffix}", server.uri()))
}

pub fn url_path(suffix: &str) -> String {
    format!("/6.5/{suffix}")
}
