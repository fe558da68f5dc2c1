use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use validator::Validate;

use crate::api::dto::{
    CreateSessionRequest, HistoryResponse, MessageRead, SendMessageRequest, SessionListResponse,
    SessionRead,
};
use crate::api::AppState;
use crate::error::{NotabeneError, Result};
use crate::models::{encode_fragment, ContextId, ContextKind};
use crate::services::SendMessage;

/// Sentinel appended by this layer to mark end-of-stream; the core never
/// produces it.
const STREAM_DONE: &str = "[DONE]";

fn context_from_path(kind: &str, id: &str) -> Result<ContextId> {
    let kind: ContextKind = kind.parse()?;
    Ok(ContextId {
        kind,
        id: id.to_string(),
    })
}

/// `POST /api/contexts/{kind}/{id}/chat`
///
/// Streams the reply as SSE-style `data:` lines, events wire-encoded as
/// `[EVENT:name:payload]` frames, terminated by `data: [DONE]`.
pub async fn send_message(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Response> {
    payload
        .validate()
        .map_err(|e| NotabeneError::Validation(e.to_string()))?;

    let context = context_from_path(&kind, &id)?;

    let fragments = state
        .chat
        .send_message(SendMessage {
            context,
            message: payload.message,
            action: payload.action,
            selected_text: payload.selected_text,
            source_ids: payload.source_ids,
            session_id: payload.session_id,
        })
        .await?;

    let sse = fragments
        .map(|fragment| format!("data: {}\n\n", encode_fragment(&fragment)))
        .chain(futures::stream::once(async {
            format!("data: {STREAM_DONE}\n\n")
        }))
        .map(Ok::<_, std::convert::Infallible>);

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    Ok((headers, Body::from_stream(sse)).into_response())
}

/// `GET /api/contexts/{kind}/{id}/chat/history`
pub async fn get_history(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>> {
    let context = context_from_path(&kind, &id)?;
    let messages = state.history.get_history(&context).await?;

    Ok(Json(HistoryResponse {
        context_id: context.key(),
        total_count: messages.len(),
        messages: messages.into_iter().map(MessageRead::from).collect(),
    }))
}

/// `DELETE /api/contexts/{kind}/{id}/chat/history`
pub async fn clear_history(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let context = context_from_path(&kind, &id)?;
    state.history.clear_history(&context).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/contexts/{kind}/{id}/chat/sessions`
pub async fn list_sessions(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<SessionListResponse>> {
    let context = context_from_path(&kind, &id)?;
    let sessions = state.history.list_sessions(&context).await?;

    let sessions: Vec<SessionRead> = sessions
        .into_iter()
        .map(|(session, count)| SessionRead::from_session(session, count))
        .collect();

    Ok(Json(SessionListResponse {
        total_count: sessions.len(),
        sessions,
    }))
}

/// `POST /api/contexts/{kind}/{id}/chat/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| NotabeneError::Validation(e.to_string()))?;

    let context = context_from_path(&kind, &id)?;
    let session = state.history.create_session(&context, payload.title).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionRead::from_session(session, 0)),
    ))
}

/// `DELETE /api/contexts/{kind}/{id}/chat/sessions/{session_id}`
pub async fn delete_session(
    State(state): State<AppState>,
    Path((kind, id, session_id)): Path<(String, String, String)>,
) -> Result<StatusCode> {
    context_from_path(&kind, &id)?;
    state.history.delete_session(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/contexts/{kind}/{id}/chat/sessions/{session_id}/history`
pub async fn get_session_history(
    State(state): State<AppState>,
    Path((kind, id, session_id)): Path<(String, String, String)>,
) -> Result<Json<HistoryResponse>> {
    let context = context_from_path(&kind, &id)?;
    let messages = state.history.get_session_history(&session_id).await?;

    Ok(Json(HistoryResponse {
        context_id: context.key(),
        total_count: messages.len(),
        messages: messages.into_iter().map(MessageRead::from).collect(),
    }))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
