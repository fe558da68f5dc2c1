use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chunk surfaced by a `search_sources` tool call, carried in
/// `search_complete` events and in assistant-message provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    /// The query that surfaced this chunk.
    pub query: String,
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(source: impl Into<String>, content: impl Into<String>, query: &str, score: f32) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            query: query.to_string(),
            score: (score * 100.0).round() / 100.0,
        }
    }
}

/// Canned instruction attached to a user turn by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAction {
    Explain,
    Expand,
    Summarize,
    Refine,
}

impl ChatAction {
    /// Instruction prepended to the user message for this action.
    pub fn instruction(&self) -> &'static str {
        match self {
            ChatAction::Explain => "Explain this passage.",
            ChatAction::Expand => "Expand on this point.",
            ChatAction::Summarize => "Summarize this content.",
            ChatAction::Refine => "Suggest improvements.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "system" => Ok(ChatRole::System),
            other => Err(format!("unknown chat role: {other}")),
        }
    }
}

/// Metadata attached to a persisted message: user-side request context
/// (action, selection, source filter) or assistant-side retrieval
/// provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ChatAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_used: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_found: Option<Vec<RetrievedChunk>>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.action.is_none()
            && self.selected_text.is_none()
            && self.source_ids.is_none()
            && self.sources_used.is_none()
            && self.chunks_found.is_none()
    }
}

/// One persisted conversation turn. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub context_id: String,
    /// `None` marks the deprecated ungrouped history kept for backward
    /// compatibility with pre-session conversations.
    pub session_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
    pub metadata: Option<MessageMetadata>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieved_chunk_rounds_score() {
        let chunk = RetrievedChunk::new("Notes", "text", "q", 0.73456);
        assert_eq!(chunk.score, 0.73);
    }

    #[test]
    fn test_metadata_skips_absent_fields() {
        let meta = MessageMetadata {
            action: Some(ChatAction::Explain),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({"action": "explain"}));
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("assistant".parse::<ChatRole>().unwrap(), ChatRole::Assistant);
        assert_eq!(ChatRole::User.to_string(), "user");
        assert!("tool".parse::<ChatRole>().is_err());
    }
}
