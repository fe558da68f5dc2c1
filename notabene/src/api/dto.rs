//! Request/response DTOs for the chat API.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{ChatAction, ChatMessage, ChatSession, MessageMetadata};

/// Request body for `POST /api/contexts/{kind}/{id}/chat`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub message: String,
    pub action: Option<ChatAction>,
    pub selected_text: Option<String>,
    /// Restrict this turn to a subset of the context's sources.
    pub source_ids: Option<Vec<String>>,
    pub session_id: Option<String>,
}

/// Request body for `POST /api/contexts/{kind}/{id}/chat/sessions`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(max = 255, message = "title too long"))]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRead {
    pub id: String,
    pub session_id: Option<String>,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    pub created_at: String,
}

impl From<ChatMessage> for MessageRead {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            session_id: message.session_id,
            role: message.role.to_string(),
            content: message.content,
            metadata: message.metadata,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub context_id: String,
    pub messages: Vec<MessageRead>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRead {
    pub id: String,
    pub context_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: u64,
}

impl SessionRead {
    pub fn from_session(session: ChatSession, message_count: u64) -> Self {
        Self {
            id: session.id,
            context_id: session.context_id,
            title: session.title,
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
            message_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<SessionRead>,
    pub total_count: usize,
}
