use async_trait::async_trait;

use crate::error::Result;

/// A tool the model may call during a conversation turn.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: serde_json::Value,
}

/// A model-issued request to invoke a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument payload as produced by the model, usually JSON.
    pub arguments: String,
}

/// One entry of the model-facing message list.
#[derive(Debug, Clone)]
pub enum PromptMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

/// One typed piece of a segmented reply. Only text segments contribute to
/// the answer; reference segments are dropped.
#[derive(Debug, Clone)]
pub enum ContentSegment {
    Text(String),
    Reference(serde_json::Value),
}

/// Reply content as delivered by a provider: either one plain string or an
/// ordered list of typed segments.
#[derive(Debug, Clone)]
pub enum ReplyContent {
    Text(String),
    Segments(Vec<ContentSegment>),
}

impl ReplyContent {
    /// Concatenate the textual parts of the reply.
    pub fn into_text(self) -> String {
        match self {
            ReplyContent::Text(text) => text,
            ReplyContent::Segments(segments) => segments
                .into_iter()
                .filter_map(|segment| match segment {
                    ContentSegment::Text(text) => Some(text),
                    ContentSegment::Reference(_) => None,
                })
                .collect(),
        }
    }
}

/// What the model produced for one round-trip: textual content, tool-call
/// requests, or both.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: Option<ReplyContent>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<PromptMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat-completion provider seam.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One round-trip of the conversation loop. Tool choice is left to the
    /// model's discretion.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply>;

    /// Single-shot, low-token completion on the cheap model variant. Used
    /// only for auxiliary generation such as session titles.
    async fn complete_brief(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}
