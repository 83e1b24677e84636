//! HTTP 接口测试：直接对 Router 调用 oneshot，不监听端口

#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use eliza::config::AppConfig;
use eliza::integrations::http::{create_router, AppState};
use eliza::llm::MockGateway;
use eliza::memory::InMemoryStore;
use eliza::AgentBuilder;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(gateway: MockGateway, store: Arc<InMemoryStore>) -> (TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.skills.dir = dir.path().join("skill");
    cfg.agent.persona_path = dir.path().join("ELIZA.md");
    cfg.tools.server_side = vec!["web_search".to_string()];

    let agent = AgentBuilder::new(cfg)
        .with_gateway(Arc::new(gateway))
        .with_store(store)
        .build()
        .unwrap();
    (dir, create_router(Arc::new(AppState::new(Arc::new(agent)))))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_returns_assistant_message() {
    let (_dir, app) = app(MockGateway::replying("hi there"), Arc::new(InMemoryStore::new()));
    let resp = app
        .oneshot(post("/chat", json!({"messages": [{"role": "user", "content": "hello"}]})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["message"]["role"], "assistant");
    assert_eq!(body["message"]["content"], "hi there");
    assert_eq!(body["sleep"], false);
    assert_eq!(body["tool_history"], json!([]));
}

#[tokio::test]
async fn test_chat_rejects_empty_messages() {
    let (_dir, app) = app(MockGateway::replying("unused"), Arc::new(InMemoryStore::new()));
    let resp = app.oneshot(post("/chat", json!({"messages": []}))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_failure_is_generic_500() {
    let (_dir, app) = app(
        MockGateway::always_calling("teleport", "{}"),
        Arc::new(InMemoryStore::new()),
    );
    let resp = app
        .oneshot(post("/chat", json!({"messages": [{"role": "user", "content": "hello"}]})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn test_memory_is_accepted_and_processed_in_background() {
    let store = Arc::new(InMemoryStore::new());
    let gw = MockGateway::new()
        .then_reply(r#"{"summary":"said hello","important_facts":[],"feedback":""}"#)
        .then_reply(r#"{"recent_conversation":"greeting","user_preferences":{}}"#);
    let (_dir, app) = app(gw, store.clone());

    let resp = app
        .oneshot(post(
            "/memory",
            json!({"messages": [{"role": "user", "content": "hello"}, {"role": "assistant", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "accepted");
    assert!(!body["request_id"].as_str().unwrap().is_empty());

    for _ in 0..100 {
        if store.summary().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(store.lines().len(), 1);
    assert!(store.summary().unwrap().contains("greeting"));
}

#[tokio::test]
async fn test_health_and_tools() {
    let (_dir, app) = app(MockGateway::replying("ok"), Arc::new(InMemoryStore::new()));

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({"status": "ok"}));

    let resp = app
        .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(resp).await, json!({"tools": ["memory_grep", "web_search"]}));
}
