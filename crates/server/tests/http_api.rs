//! HTTP-level tests for the banking assistant API
//!
//! Requests go straight through the router with `oneshot`; no socket is
//! bound.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bank_assistant_agent::BankingAssistant;
use bank_assistant_config::{DomainConfig, Settings};
use bank_assistant_server::{create_router, AppState};

fn test_state() -> AppState {
    let settings = Settings::default();
    let domain = DomainConfig::embedded().unwrap();
    let assistant = BankingAssistant::from_domain(&domain, &settings).unwrap();
    AppState::new(settings, assistant)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_session(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = create_router(test_state());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_without_fallback() {
    let app = create_router(test_state());
    let (status, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["llm_fallback"]["status"], "disabled");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = create_router(test_state());
    let id = create_session(&app).await;

    let (status, body) = send(&app, get(&format!("/api/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["phase"], "idle");

    let (status, body) = send(&app, get("/api/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get(&format!("/api/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn test_chat_incremental_transfer() {
    let app = create_router(test_state());
    let id = create_session(&app).await;
    let uri = format!("/api/chat/{id}");
    let user = json!({ "user_id": "client-42", "display_name": "Sami" });

    let (status, body) = send(
        &app,
        post_json(&uri, json!({ "message": "je veux faire un virement de 600dt", "user_context": user })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "transfer_money");
    assert_eq!(body["requires_action"], false);
    assert_eq!(body["session"]["phase"], "awaiting_slots");

    let (status, body) = send(
        &app,
        post_json(
            &uri,
            json!({ "message": "vers Juliette compte 1984573201694", "user_context": user }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requires_action"], true);
    assert_eq!(body["action_type"], "transfer_money");
    assert_eq!(body["parameters"]["recipient_account"], "1984573201694");
    assert_eq!(body["session"]["phase"], "idle");
    assert!(body.get("outcome").is_none());
}

#[tokio::test]
async fn test_chat_with_execution() {
    let app = create_router(test_state());
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/chat/{id}"),
            json!({ "message": "quel est mon solde", "execute": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "check_balance");
    assert_eq!(body["outcome"]["success"], true);
    assert_eq!(body["outcome"]["data"]["dry_run"], true);
    assert_eq!(body["outcome"]["data"]["user_id"], "anonymous");
}

#[tokio::test]
async fn test_chat_unknown_session() {
    let app = create_router(test_state());
    let (status, _) = send(
        &app,
        post_json("/api/chat/missing", json!({ "message": "bonjour" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_rejects_blank_user_id() {
    let app = create_router(test_state());
    let id = create_session(&app).await;
    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/chat/{id}"),
            json!({ "message": "bonjour", "user_context": { "user_id": "  " } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_session() {
    let app = create_router(test_state());
    let id = create_session(&app).await;

    send(
        &app,
        post_json(
            &format!("/api/chat/{id}"),
            json!({ "message": "je veux faire un virement de 600dt" }),
        ),
    )
    .await;

    let reset = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{id}/reset"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, reset).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["missing"], json!([]));
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let app = create_router(test_state());
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
