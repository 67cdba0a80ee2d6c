#![allow(clippy::unwrap_used)]
// Integration tests for search, lookup and creation through `Collection`.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smc_core::{
    Collection, CoreError, GenericElement, Host, HostSpec, Network, NetworkSpec, SearchQuery,
    TypeRegistry, TypedElement,
};

use common::{href, setup, url_path};

fn hit(server: &MockServer, kind: &str, id: u32, name: &str) -> serde_json::Value {
    json!({ "href": href(server, &format!("elements/{kind}/{id}")), "name": name, "type": kind })
}

// ── Search ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_search_finds_exactly_one() {
    let (server, session) = setup().await;
    Mock::given(method("POST"))
        .and(path(url_path("elements/network")))
        .and(body_json(json!({
            "name": "net-10",
            "ipv4_network": "10.0.0.0/8",
            "comment": ""
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", href(&server, "elements/network/7").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/network")))
        .and(query_param("filter", "net-10"))
        .and(query_param("exact_match", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": [hit(&server, "network", 7, "net-10")] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = TypeRegistry::with_builtin();
    let collection = Collection::new(session.clone(), &registry);

    let created = collection
        .create_element_spec(&NetworkSpec::ipv4("net-10", "10.0.0.0/8"))
        .await
        .unwrap();
    assert!(created.is::<Network>());
    assert_eq!(created.href(), &href(&server, "elements/network/7"));
    assert_eq!(created.name(), Some("net-10"));

    let mut results = collection
        .search(&SearchQuery::new().kind("network").name("net-10"))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let handle = results.next().unwrap();
    assert_eq!(handle.href, href(&server, "elements/network/7"));
    assert_eq!(handle.kind, "network");
    assert!(results.next().is_none());

    let typed = handle.promote(&session, &registry);
    assert!(typed.is::<Network>());
}

#[tokio::test]
async fn created_element_reads_back_its_fields() {
    let (server, session) = setup().await;
    Mock::given(method("POST"))
        .and(path(url_path("elements/host")))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", href(&server, "elements/host/3").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/host/3")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "h3")
                .set_body_json(json!({
                    "name": "Zürich-Büro",
                    "address": "192.168.1.10",
                    "secondary": ["192.168.1.11"],
                    "comment": "branch office"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = TypeRegistry::with_builtin();
    let collection = Collection::new(session, &registry);
    let spec = HostSpec::new("Zürich-Büro", "192.168.1.10")
        .secondary("192.168.1.11")
        .comment("branch office");

    let mut host = collection
        .create_element_spec(&spec)
        .await
        .unwrap()
        .downcast::<Host>()
        .unwrap();

    assert_eq!(host.address().await.unwrap(), Some(spec.address.as_str()));
    assert_eq!(host.secondary().await.unwrap(), spec.secondary);
    assert_eq!(host.comment().await.unwrap(), Some(spec.comment.as_str()));
}

#[tokio::test]
async fn unregistered_kind_is_passed_as_filter_context() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path(url_path("elements")))
        .and(query_param("filter_context", "fw_cluster"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([hit(&server, "fw_cluster", 2, "dc-1")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = TypeRegistry::with_builtin();
    let collection = Collection::new(session.clone(), &registry);
    let handles: Vec<_> = collection
        .search(&SearchQuery::new().kind("fw_cluster"))
        .await
        .unwrap()
        .collect();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].kind, "fw_cluster");
    let typed = handles[0].clone().promote(&session, &registry);
    assert!(typed.is::<GenericElement>());
}

#[tokio::test]
async fn registered_kind_without_entry_point_filters_by_type() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path(url_path("elements")))
        .and(query_param("filter_context", "address_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            hit(&server, "address_range", 4, "dhcp-pool"),
            hit(&server, "host", 5, "dhcp-pool")
        ])))
        .mount(&server)
        .await;

    let collection = Collection::global(session);
    let handles: Vec<_> = collection
        .search(&SearchQuery::new().kind("address_range").name("dhcp-pool"))
        .await
        .unwrap()
        .collect();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].kind, "address_range");
}

#[tokio::test]
async fn explicit_filter_keeps_unregistered_kind() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path(url_path("elements")))
        .and(query_param("filter", "dc"))
        .and(query_param("filter_context", "network_elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            hit(&server, "fw_cluster", 2, "dc"),
            hit(&server, "host", 6, "dc")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let collection = Collection::global(session);
    let kinds: Vec<String> = collection
        .search(
            &SearchQuery::new()
                .kind("fw_cluster")
                .filter("network_elements")
                .name("dc"),
        )
        .await
        .unwrap()
        .map(|handle| handle.kind)
        .collect();

    assert_eq!(kinds, vec!["fw_cluster".to_owned()]);
}

#[tokio::test]
async fn empty_search_is_not_an_error() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/host")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
        .mount(&server)
        .await;

    let collection = Collection::global(session);
    let results = collection
        .search(&SearchQuery::new().kind("host").name("nope"))
        .await
        .unwrap();
    assert_eq!(results.len(), 0);
}

// ── Exact lookup ────────────────────────────────────────────────────

#[tokio::test]
async fn get_requires_exactly_one_hit() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/host")))
        .and(query_param("filter", "web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            hit(&server, "host", 1, "web"),
            hit(&server, "host", 2, "web")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/host")))
        .and(query_param("filter", "db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(url_path("elements/host")))
        .and(query_param("filter", "cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([hit(&server, "host", 3, "cache")])))
        .mount(&server)
        .await;

    let collection = Collection::global(session);

    assert!(matches!(
        collection.get("host", "web").await,
        Err(CoreError::Ambiguous { count: 2, .. })
    ));
    assert!(matches!(
        collection.get("host", "db").await,
        Err(CoreError::NotFound { .. })
    ));

    let host = collection.get_as::<Host>("cache").await.unwrap();
    assert_eq!(host.href(), &href(&server, "elements/host/3"));
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_create_is_envelope() {
    let (server, session) = setup().await;
    Mock::given(method("POST"))
        .and(path(url_path("elements/host")))
        .and(body_partial_json(json!({ "name": "web-1" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Element name web-1 is already used"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let collection = Collection::global(session);
    let spec = HostSpec::new("web-1", "10.0.0.5");

    let result = collection.create_spec(&spec).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, 409);
    assert!(result.message.unwrap().contains("already used"));

    assert!(matches!(
        collection.create_element_spec(&spec).await,
        Err(CoreError::RequestFailed { status: 409, .. })
    ));
}

#[tokio::test]
async fn create_for_unknown_entry_point_fails() {
    let (_server, session) = setup().await;
    let collection = Collection::global(session);

    assert!(matches!(
        collection.create("vpn_profile", serde_json::Map::new()).await,
        Err(CoreError::Api(smc_api::Error::UnsupportedEntryPoint(_)))
    ));
}
