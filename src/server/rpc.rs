//! `POST /rpc` (request/response) and `GET /rpc` (SSE push half).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use mcp_kernel::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
use mcp_kernel::tool::ToolContext;
use mcp_kernel::transport::SseTransport;

use crate::errors::CoreError;

use super::AppState;

pub async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let response = dispatch(&state, &headers, request).await;
    Json(response)
}

async fn dispatch(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let id = request.id.clone();

    let header_session_id = super::session_id_from_headers(headers);

    // §4.8 session resolution: reuse an in-memory session, recover a
    // persisted-but-disconnected one, open a fresh one for "initialize" (or
    // no header at all), else this request has no valid session to run in.
    let session_id = match &header_session_id {
        Some(sid) if state.sessions.is_active(sid) => {
            state.sessions.touch(sid);
            sid.clone()
        }
        Some(sid) if state.store.get_session(sid).await.ok().flatten().is_some() => {
            let (transport, rx) = SseTransport::pair();
            std::mem::drop(rx);
            match state.sessions.recover(sid, Arc::new(transport), ".").await {
                Ok(_) => sid.clone(),
                Err(e) => return error_response(id, &e),
            }
        }
        Some(_) | None if request.is_initialize() || header_session_id.is_none() => {
            let session_id = super::new_session_id();
            let working_directory = request
                .params
                .as_ref()
                .and_then(|p| p.get("working_directory"))
                .and_then(|v| v.as_str())
                .unwrap_or(".")
                .to_string();
            return match state
                .store
                .init_session(&session_id, &working_directory, serde_json::json!({}))
                .await
            {
                Ok(()) => JsonRpcResponse::success(
                    id,
                    serde_json::json!({ "mcp_session_id": session_id, "protocol_version": mcp_kernel::VERSION }),
                ),
                Err(e) => error_response(id, &e),
            };
        }
        _ => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::server_error("Bad Request: no valid session id...", None),
            )
        }
    };

    let bearer = super::bearer_token_from_headers(headers);
    let is_admin = bearer.as_deref().is_some_and(|t| t == state.admin_token);
    let agent_id = bearer.and_then(|token| state.auth.authenticate(&token).ok());

    let ctx = ToolContext {
        session_id,
        agent_id,
        request_id: id.clone(),
        is_admin,
    };

    match request.method.as_str() {
        "tools/list" => {
            let registry = state.registry.read().await;
            JsonRpcResponse::success(id, serde_json::json!({ "tools": registry.list() }))
        }
        "tools/call" => {
            let name = request
                .params
                .as_ref()
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str());
            let args = request
                .params
                .as_ref()
                .and_then(|p| p.get("arguments"))
                .cloned()
                .unwrap_or(serde_json::json!({}));
            let Some(name) = name else {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("missing 'name'"),
                );
            };
            let registry = state.registry.read().await;
            match registry.execute(name, args, &ctx).await {
                Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result).unwrap()),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::server_error(e.to_string(), None)),
            }
        }
        "resources/list" => match state.resources.list_all().await {
            Ok(resources) => {
                JsonRpcResponse::success(id, serde_json::json!({ "resources": resources }))
            }
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::server_error(e.to_string(), None)),
        },
        "resources/read" => {
            let uri = request
                .params
                .as_ref()
                .and_then(|p| p.get("uri"))
                .and_then(|v| v.as_str());
            let Some(uri) = uri else {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing 'uri'"));
            };
            match state.resources.fetch(uri, ctx.is_admin).await {
                Ok(Some(content)) => JsonRpcResponse::success(
                    id,
                    serde_json::json!({
                        "mimeType": content.mime_type(),
                        "text": content.into_string(),
                    }),
                ),
                Ok(None) => JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("no resource at '{uri}'")),
                ),
                Err(e) => {
                    JsonRpcResponse::error(id, JsonRpcError::server_error(e.to_string(), None))
                }
            }
        }
        other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
    }
}

fn error_response(id: RequestId, e: &CoreError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, JsonRpcError::server_error(e.to_string(), None))
}

pub fn core_error_response(e: CoreError) -> axum::response::Response {
    let status = match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Auth(_) => StatusCode::UNAUTHORIZED,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::RecoveryDenied(_) => StatusCode::BAD_REQUEST,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}

/// `GET /rpc`: establishes (or recovers) the SSE push half of a session.
pub async fn handle_sse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (transport, rx) = SseTransport::pair();
    let transport: Arc<SseTransport> = Arc::new(transport);

    let session_id = super::session_id_from_headers(&headers).unwrap_or_else(super::new_session_id);

    if state.store.get_session(&session_id).await.ok().flatten().is_some() {
        let _ = state.sessions.recover(&session_id, transport, "").await;
    } else {
        let _ = state
            .sessions
            .open_session(&session_id, ".", transport)
            .await;
    }

    let stream = UnboundedReceiverStream::new(rx).map(|line| Ok(Event::default().data(line)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
