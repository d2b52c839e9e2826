//! Integration tests for the webhook reverse proxy, driven through the
//! router via `tower::ServiceExt::oneshot` rather than a bound socket —
//! the idiomatic way to exercise an `axum`/`tower` service in this stack.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use fleetctl_core::{AgentId, AgentStatus};
use fleetctl_gateway::app::{build_router, AppState};
use fleetctl_store::DurableStore;
use hex::encode as hex_encode;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use sha2::Sha256;
use tower::ServiceExt;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn state_with(store: DurableStore) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(store), 20))
}

async fn post(router: Router, uri: &str, headers: Vec<(&str, &str)>, body: &str) -> Response {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (k, v) in headers {
        builder = builder.header(k, v);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    router.oneshot(request).await.unwrap()
}

#[tokio::test]
async fn unknown_agent_is_not_found() {
    let store = DurableStore::open_in_memory().unwrap();
    let state = state_with(store);
    let router = build_router(state);

    let resp = post(router, "/webhooks/ghost/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_agent_is_not_found() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_disabled(&agent, true).unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_control_url_is_service_unavailable() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_source_is_not_found() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/missing-source", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrong_bearer_is_unauthorized() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();
    store.set_agent_acp_token(&agent, "correct-token").unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(
        router,
        "/webhooks/a1/deploy",
        vec![("authorization", "Bearer wrong-token")],
        "{}",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dev_mode_with_no_stored_token_accepts_any_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events/deploy"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, &server.uri()).unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn missing_hmac_signature_header_is_unauthorized() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();
    store
        .upsert_gateway_config(&agent, "deploy", "hmac-sha256", Some("shared-secret"))
        .unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mismatched_hmac_is_unauthorized() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();
    store
        .upsert_gateway_config(&agent, "deploy", "hmac-sha256", Some("shared-secret"))
        .unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(
        router,
        "/webhooks/a1/deploy",
        vec![("x-hub-signature-256", "sha256=deadbeef")],
        "{}",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_hmac_forwards_exact_body_with_bearer_token() {
    let server = MockServer::start().await;
    let body = r#"{"event":"push"}"#;
    let mut mac = Hmac::<Sha256>::new_from_slice(b"k").unwrap();
    mac.update(body.as_bytes());
    let sig = format!("sha256={}", hex_encode(mac.finalize().into_bytes()));

    Mock::given(method("POST"))
        .and(path("/events/deploy"))
        .and(header("authorization", "Bearer tok"))
        .and(body_bytes(body.as_bytes()))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, &server.uri()).unwrap();
    store.set_agent_acp_token(&agent, "tok").unwrap();
    store
        .upsert_gateway_config(&agent, "deploy", "hmac-sha256", Some("k"))
        .unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(
        router,
        "/webhooks/a1/deploy",
        vec![("x-hub-signature-256", sig.as_str())],
        body,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn unreachable_control_url_is_bad_gateway() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store
        .set_agent_control_url(&agent, "http://127.0.0.1:9")
        .unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn burst_past_limit_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events/deploy"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, &server.uri()).unwrap();
    store.upsert_gateway_config(&agent, "deploy", "bearer", None).unwrap();

    let state = Arc::new(AppState::new(Arc::new(store), 2));
    let router = build_router(state);

    for _ in 0..2 {
        let resp = post(router.clone(), "/webhooks/a1/deploy", vec![], "{}").await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
    let resp = post(router.clone(), "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn unsupported_auth_type_is_configuration_error() {
    let store = DurableStore::open_in_memory().unwrap();
    let agent = AgentId::new("a1");
    store.create_agent(&agent, "worker").unwrap();
    store.set_agent_control_url(&agent, "http://127.0.0.1:1").unwrap();
    store
        .upsert_gateway_config(&agent, "deploy", "carrier-pigeon", None)
        .unwrap();

    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/a1/deploy", vec![], "{}").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn error_responses_carry_a_json_body_success_responses_do_not() {
    let store = DurableStore::open_in_memory().unwrap();
    let state = state_with(store);
    let router = build_router(state);
    let resp = post(router, "/webhooks/ghost/deploy", vec![], "{}").await;
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(!body.is_empty());
}
