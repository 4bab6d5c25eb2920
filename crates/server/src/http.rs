//! HTTP Endpoints
//!
//! REST API for the banking assistant.

use axum::{
    extract::{Json, MatchedPath, Path, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use bank_assistant_agent::{SessionSummary, TurnResult};
use bank_assistant_core::UserContext;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::ServerError;

const ANONYMOUS_USER: &str = "anonymous";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        // Session endpoints
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Chat endpoint
        .route("/api/chat/:session_id", post(chat))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_requests))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods(methods)
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    record_request(route, response.status());
    response
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

/// Create session
async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let session = state.sessions().create()?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id.clone(),
        }),
    ))
}

/// List sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions().summaries();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ServerError> {
    let session = state
        .sessions()
        .get(&id)
        .ok_or(ServerError::SessionNotFound(id))?;
    Ok(Json(session.summary()))
}

/// End a session and drop its state
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.sessions().remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

/// Explicit reset: pending request and transcript are cleared
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ServerError> {
    let session = state
        .sessions()
        .get(&id)
        .ok_or(ServerError::SessionNotFound(id))?;
    session.reset().await;
    Ok(Json(session.summary()))
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    user_context: Option<UserContext>,
    /// Hand a complete action to banking execution
    #[serde(default)]
    execute: bool,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    #[serde(flatten)]
    result: TurnResult,
    session: SessionSummary,
}

/// Chat endpoint
async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let user = request
        .user_context
        .unwrap_or_else(|| UserContext::new(ANONYMOUS_USER));
    if user.user_id.trim().is_empty() {
        return Err(ServerError::InvalidRequest("user_context.user_id is empty".to_string()));
    }

    let assistant = &state.assistant;
    let result = if request.execute {
        assistant
            .handle_and_execute(&session_id, &request.message, &user)
            .await?
    } else {
        TurnResult {
            decision: assistant
                .handle_turn(&session_id, &request.message, &user)
                .await?,
            outcome: None,
        }
    };

    let session = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| ServerError::SessionNotFound(session_id.clone()))?
        .summary();

    Ok(Json(ChatResponse {
        session_id,
        result,
        session,
    }))
}

/// Liveness: the rule engine needs nothing external
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions().count(),
    }))
}

/// Readiness, including LLM fallback connectivity when it is configured
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    checks.insert(
        "sessions".to_string(),
        serde_json::json!({
            "status": "ok",
            "count": state.sessions().count(),
            "max": state.config.sessions.max_sessions,
        }),
    );

    let llm_status = if !state.assistant.has_fallback() {
        "disabled"
    } else {
        match tokio::time::timeout(Duration::from_secs(2), state.assistant.fallback_available()).await {
            Ok(true) => "ok",
            Ok(false) => {
                ready = false;
                "unreachable"
            }
            Err(_) => {
                ready = false;
                "timeout"
            }
        }
    };
    checks.insert(
        "llm_fallback".to_string(),
        serde_json::json!({ "status": llm_status }),
    );

    let (status, status_code) = if ready {
        ("ready", StatusCode::OK)
    } else {
        ("not_ready", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "checks": checks
        })),
    )
}
