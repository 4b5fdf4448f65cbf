//! Router-level tests for the customer and diagnostics handlers.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use strata::cache::{MockDistributedStore, TieredCache};
use strata::config::{CacheSettings, Environment};
use strata::customers::{CUSTOMER_KEYS, InMemoryCustomerRepository};

use crate::gateway::create_router_with_state;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;

type TestState = HandlerState<InMemoryCustomerRepository, MockDistributedStore>;

fn test_state(environment: Environment) -> (TestState, MockDistributedStore) {
    let store = MockDistributedStore::new();
    let cache = Arc::new(TieredCache::with_store(
        CacheSettings::default(),
        store.clone(),
    ));
    let state = HandlerState::new(
        Arc::new(InMemoryCustomerRepository::new()),
        cache,
        environment,
    );
    (state, store)
}

fn router(environment: Environment) -> (Router, TestState, MockDistributedStore) {
    let (state, store) = test_state(environment);
    (create_router_with_state(state.clone()), state, store)
}

fn ana_json() -> serde_json::Value {
    serde_json::json!({
        "name": "Ana Souza",
        "tax_id": "529.982.247-25",
        "email": "ana@example.com"
    })
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create_ana(router: &Router) -> String {
    let (status, body) = send(router, json_request("POST", "/customers", &ana_json())).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _, _) = router(Environment::Production);
    let (status, body) = send(&router, empty_request("GET", "/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ready_reports_distributed_tier() {
    let (router, _, store) = router(Environment::Production);

    let (status, body) = send(&router, empty_request("GET", "/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["distributed"], "ready");

    store.set_available(false);
    let (status, body) = send(&router, empty_request("GET", "/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["distributed"], "unavailable");
}

#[tokio::test]
async fn test_create_then_get_is_served_from_cache() {
    let (router, state, _) = router(Environment::Production);
    let id = create_ana(&router).await;

    let uri = format!("/customers/{id}");
    let (status, first) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["tax_id"], "52998224725");

    let (_, second) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(first, second);
    assert_eq!(state.customers.repository().read_count(), 1);
}

#[tokio::test]
async fn test_get_unknown_customer_is_404() {
    let (router, _, _) = router(Environment::Production);
    let uri = format!("/customers/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_duplicate_tax_id_is_409() {
    let (router, _, _) = router(Environment::Production);
    create_ana(&router).await;

    let mut duplicate = ana_json();
    duplicate["email"] = serde_json::json!("other@example.com");
    let (status, body) = send(&router, json_request("POST", "/customers", &duplicate)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let (router, _, _) = router(Environment::Production);
    let mut invalid = ana_json();
    invalid["name"] = serde_json::json!("Al");

    let (status, _) = send(&router, json_request("POST", "/customers", &invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, empty_request("GET", "/customers?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, empty_request("GET", "/customers?page_size=101")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_search() {
    let (router, _, _) = router(Environment::Production);
    create_ana(&router).await;
    let bruno = serde_json::json!({
        "name": "Bruno Lima",
        "tax_id": "11144477735",
        "email": "bruno@example.com"
    });
    send(&router, json_request("POST", "/customers", &bruno)).await;

    let (status, page) = send(&router, empty_request("GET", "/customers?page=1&pageSize=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"][0]["name"], "Ana Souza");

    let (_, found) = send(&router, empty_request("GET", "/customers?name=lima")).await;
    assert_eq!(found["items"].as_array().unwrap().len(), 1);
    assert_eq!(found["items"][0]["email"], "bruno@example.com");
}

#[tokio::test]
async fn test_update_refreshes_cached_customer() {
    let (router, _, _) = router(Environment::Production);
    let id = create_ana(&router).await;
    let uri = format!("/customers/{id}");
    send(&router, empty_request("GET", &uri)).await;

    let mut renamed = ana_json();
    renamed["name"] = serde_json::json!("Ana Paula Souza");
    let (status, _) = send(&router, json_request("PUT", &uri, &renamed)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(fetched["name"], "Ana Paula Souza");
}

#[tokio::test]
async fn test_patch_requires_a_field() {
    let (router, _, _) = router(Environment::Production);
    let id = create_ana(&router).await;
    let uri = format!("/customers/{id}");

    let (status, _) = send(&router, json_request("PATCH", &uri, &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let patch = serde_json::json!({ "email": "ana.souza@example.com" });
    let (status, body) = send(&router, json_request("PATCH", &uri, &patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana.souza@example.com");
    assert_eq!(body["name"], "Ana Souza");
}

#[tokio::test]
async fn test_delete_then_get_is_404() {
    let (router, _, _) = router(Environment::Production);
    let id = create_ana(&router).await;
    let uri = format!("/customers/{id}");
    send(&router, empty_request("GET", &uri)).await;

    let (status, _) = send(&router, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_diagnostics_are_forbidden_outside_development() {
    let (router, _, _) = router(Environment::Production);

    for (method, uri) in [
        ("GET", "/cache/stats"),
        ("GET", "/cache/keys"),
        ("DELETE", "/cache/clear"),
        ("DELETE", "/cache/key/customers:list:1:10:name:asc"),
    ] {
        let (status, body) = send(&router, empty_request(method, uri)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(body["code"], 403);
    }
}

#[tokio::test]
async fn test_cache_stats_and_keys_in_development() {
    let (router, _, _) = router(Environment::Development);
    let id = create_ana(&router).await;
    send(&router, empty_request("GET", &format!("/customers/{id}"))).await;

    let (status, stats) = send(&router, empty_request("GET", "/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["environment"], "development");
    assert_eq!(stats["enabled"], true);
    assert_eq!(stats["key_prefix"], "strata:");
    assert_eq!(stats["ttl_seconds"]["entity"], 600);
    assert_eq!(stats["tracked_keys"], 1);
    assert_eq!(stats["distributed"]["configured"], true);
    assert_eq!(stats["distributed"]["connected"], true);

    let (status, keys) = send(&router, empty_request("GET", "/cache/keys")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys["count"], 1);
    let expected = format!("strata:{}", CUSTOMER_KEYS.entity_key(&id));
    assert_eq!(keys["keys"][0]["key"], expected.as_str());
}

#[tokio::test]
async fn test_remove_key_and_clear_in_development() {
    let (router, state, store) = router(Environment::Development);
    let id = create_ana(&router).await;
    let uri = format!("/customers/{id}");
    send(&router, empty_request("GET", &uri)).await;
    send(&router, empty_request("GET", "/customers")).await;
    assert_eq!(state.cache().tracked_key_count(), 2);

    let entity = CUSTOMER_KEYS.entity_key(&id);
    let (status, report) =
        send(&router, empty_request("DELETE", &format!("/cache/key/{entity}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["target"], entity.as_str());
    assert_eq!(report["distributed_removed"], 1);
    assert!(!store.contains(&format!("strata:{entity}")));

    let (status, report) = send(&router, empty_request("DELETE", "/cache/clear")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["failures"], 0);
    assert_eq!(state.cache().tracked_key_count(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_gateway_error_status_mapping() {
    let cases = [
        (GatewayError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        (GatewayError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (GatewayError::Conflict("x".into()), StatusCode::CONFLICT),
        (GatewayError::Forbidden, StatusCode::FORBIDDEN),
        (GatewayError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        (
            GatewayError::InternalError("x".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        let response = error.into_response();
        assert_eq!(response.status(), expected);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], expected.as_u16());
    }
}
