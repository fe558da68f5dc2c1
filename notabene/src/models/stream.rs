use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::RetrievedChunk;

/// One fragment of a streamed chat turn: either user-visible answer text or
/// a structured lifecycle event. Consumers get a discriminated stream and
/// never need to parse prose for embedded markers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatFragment {
    Token(String),
    Event(ChatEvent),
}

/// Side-channel notifications multiplexed into the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    SearchStart {
        query: String,
    },
    SearchComplete {
        sources: Vec<String>,
        chunks: Vec<RetrievedChunk>,
    },
    TitleGenerated {
        session_id: String,
        title: String,
    },
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::SearchStart { .. } => "search_start",
            ChatEvent::SearchComplete { .. } => "search_complete",
            ChatEvent::TitleGenerated { .. } => "title_generated",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            ChatEvent::SearchStart { query } => json!({ "query": query }),
            ChatEvent::SearchComplete { sources, chunks } => {
                json!({ "sources": sources, "chunks": chunks })
            }
            ChatEvent::TitleGenerated { session_id, title } => {
                json!({ "session_id": session_id, "title": title })
            }
        }
    }
}

/// Wire encoding used by the streaming HTTP surface: answer tokens pass
/// through verbatim, events become `[EVENT:<name>:<json-payload>]` frames.
pub fn encode_fragment(fragment: &ChatFragment) -> String {
    match fragment {
        ChatFragment::Token(text) => text.clone(),
        ChatFragment::Event(event) => {
            format!("[EVENT:{}:{}]", event.name(), event.payload())
        }
    }
}

fn event_frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Tolerates one level of nested brackets inside the JSON payload,
        // e.g. [EVENT:x:{"a":[1,2]}].
        Regex::new(r#"\[EVENT:[^\]]*(?:\[[^\]]*\])*[^\]]*\]"#)
            .expect("event frame pattern is valid")
    })
}

/// Strip wire-encoded event frames from response text, leaving only prose.
/// Used before persisting answers and when rendering legacy content that
/// was stored with frames embedded.
pub fn clean_response(text: &str) -> String {
    event_frame_pattern().replace_all(text, "").into_owned()
}
