//! HTTP surface: `POST /rpc` for request/response JSON-RPC,
//! `GET /rpc` for the SSE push half, plus small operational endpoints.
//!
//! axum/tower/tower-http router, always built rather than feature-gated,
//! since this is the only transport.

mod rpc;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::AuthIndex;
use crate::config::ServerConfig;
use crate::rag::Retriever;
use crate::resources::ResourceHub;
use crate::session_manager::SessionManager;
use crate::store::Store;
use crate::supervisor::Supervisor;
use crate::tmux::TmuxOps;
use mcp_kernel::registry::ToolRegistry;

pub struct AppState {
    pub store: Store,
    pub tmux: Arc<dyn TmuxOps>,
    pub auth: Arc<AuthIndex>,
    pub supervisor: Arc<Supervisor>,
    pub sessions: Arc<SessionManager>,
    pub registry: RwLock<ToolRegistry>,
    pub resources: ResourceHub,
    pub retriever: Arc<dyn Retriever>,
    pub config: ServerConfig,
    pub started_at: Instant,
    /// The bootstrapped admin token. Compared directly against the bearer
    /// header — never registered in `AuthIndex` — to decide `is_admin`.
    pub admin_token: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc::handle_post).get(rpc::handle_sse))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id/recover", post(recover_session))
        .route("/config", get(get_config).post(post_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tmux_available = state.tmux.available().await;
    let registry = state.registry.read().await;
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "tmux_available": tmux_available,
        "enabled_categories": registry.enabled_categories(),
    }))
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match (state.store.list_agents().await, state.store.list_all_tasks().await) {
        (Ok(agents), Ok(tasks)) => {
            let active_agents = agents
                .iter()
                .filter(|a| a.status == crate::types::AgentStatus::Active)
                .count();
            let by_status = |s: crate::types::TaskStatus| {
                tasks.iter().filter(|t| t.status == s).count()
            };
            Json(json!({
                "agent_count": agents.len(),
                "active_agent_count": active_agents,
                "task_count": tasks.len(),
                "tasks_pending": by_status(crate::types::TaskStatus::Pending),
                "tasks_in_progress": by_status(crate::types::TaskStatus::InProgress),
                "tasks_completed": by_status(crate::types::TaskStatus::Completed),
            }))
            .into_response()
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "failed to gather stats").into_response(),
    }
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.sessions.list_sessions().await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn recover_session(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> impl IntoResponse {
    let (transport, rx) = mcp_kernel::transport::SseTransport::pair();
    std::mem::drop(rx); // the real SSE stream is re-established by the client's next GET /rpc
    match state
        .sessions
        .recover(&id, Arc::new(transport), "")
        .await
    {
        Ok(row) => Json(row).into_response(),
        Err(e) => rpc::core_error_response(e),
    }
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Json(json!({
        "configured_at_boot": state.config.enabled_categories,
        "effective": registry.enabled_categories(),
    }))
}

#[derive(serde::Deserialize)]
struct ConfigUpdate {
    categories: Vec<String>,
}

async fn post_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConfigUpdate>,
) -> impl IntoResponse {
    let mut registry = state.registry.write().await;
    let update = registry.update_configuration(&body.categories);
    Json(update)
}

/// Mints a fresh session id for a new `GET /rpc` connection, distinct from
/// whatever id a recovering client presents via `Mcp-Session-Id`.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Mcp-Session-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn bearer_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}
