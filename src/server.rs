//! HTTP front end for the chat widget.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::service::{ChatResponse, ChatService};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub old_conversation_id: Option<String>,
}

/// Sent by the widget when it closes a conversation.
#[derive(Debug, Default, Deserialize)]
pub struct EndRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub new_conversation_id: String,
}

/// Build the router over a shared service.
pub fn router(service: Arc<ChatService>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/start", post(start))
        .route("/api/chat", post(chat))
        .route("/api/check_timeout", post(check_timeout))
        .route("/api/chat/end_conversation", post(end_conversation))
        .route("/api/reset_conversation", post(reset_conversation))
        .layer(cors(allowed_origins))
        .with_state(service)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(service: Arc<ChatService>, bind: &str, allowed_origins: &[String]) -> Result<()> {
    let app = router(service, allowed_origins);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    tracing::info!("Patty listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;
    tracing::info!("Patty stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_origins(allowed_origins)))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect()
}

async fn start(State(service): State<Arc<ChatService>>) -> Json<ChatResponse> {
    Json(service.start())
}

async fn chat(
    State(service): State<Arc<ChatService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<Value>)> {
    let conversation_id = request.conversation_id.unwrap_or_default();
    // Turns call the model over blocking HTTP.
    tokio::task::spawn_blocking(move || service.submit(&conversation_id, &request.question))
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn check_timeout() -> Json<Value> {
    Json(json!({ "timeout": false }))
}

/// Drop the cached session of a closed conversation; its stored lead is kept.
async fn end_conversation(
    State(service): State<Arc<ChatService>>,
    request: Option<Json<EndRequest>>,
) -> Json<Value> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    if let Some(id) = request.conversation_id.filter(|id| !id.is_empty()) {
        let status = request.status.as_deref().unwrap_or("unknown");
        if service.evict(&id) {
            tracing::debug!("Client closed conversation {id} ({status})");
        }
    }
    Json(json!({ "success": true }))
}

/// Drop the cached session of the old conversation; its stored lead is kept.
async fn reset_conversation(
    State(service): State<Arc<ChatService>>,
    request: Option<Json<ResetRequest>>,
) -> Json<ResetResponse> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    if let Some(old) = request.old_conversation_id.filter(|id| !id.is_empty()) {
        service.evict(&old);
    }
    Json(ResetResponse {
        success: true,
        new_conversation_id: uuid::Uuid::new_v4().to_string(),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn internal_error(e: tokio::task::JoinError) -> (StatusCode, Json<Value>) {
    tracing::warn!("Chat turn aborted: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
