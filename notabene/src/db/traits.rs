use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ChatMessage, ChatSession, ContextId, SourceText};

/// Read access to ingested sources. Sources are created by the upstream
/// ingestion pipeline; this crate only lists them per context (plus a
/// creation hook used by seeding and tests).
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn create_source(&self, source: &SourceText) -> Result<()>;
    async fn sources_for_context(&self, context: &ContextId) -> Result<Vec<SourceText>>;
}

/// Persistence for conversation turns.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, message: &ChatMessage) -> Result<()>;
    /// Every message of a context, oldest first, across all sessions.
    async fn context_history(&self, context: &ContextId) -> Result<Vec<ChatMessage>>;
    /// The deprecated ungrouped history: messages persisted without a
    /// session id, oldest first.
    async fn ungrouped_history(&self, context: &ContextId) -> Result<Vec<ChatMessage>>;
    async fn session_history(&self, session_id: &str) -> Result<Vec<ChatMessage>>;
    async fn clear_context_history(&self, context: &ContextId) -> Result<u64>;
}

/// Persistence for chat sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &ChatSession) -> Result<()>;
    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>>;
    /// Sessions of a context with their message counts, most recently
    /// updated first.
    async fn list_sessions(&self, context: &ContextId) -> Result<Vec<(ChatSession, u64)>>;
    async fn rename_session(&self, id: &str, title: &str, updated_at: DateTime<Utc>)
        -> Result<bool>;
    /// Delete a session and cascade to its messages.
    async fn delete_session(&self, id: &str) -> Result<bool>;
}

/// The full persistence surface the chat core depends on.
pub trait ChatStore: SourceStore + MessageStore + SessionStore {}

impl<T: SourceStore + MessageStore + SessionStore> ChatStore for T {}
