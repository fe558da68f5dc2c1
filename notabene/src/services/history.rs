use std::sync::Arc;

use crate::db::ChatStore;
use crate::error::{NotabeneError, Result};
use crate::models::{ChatMessage, ChatSession, ContextId};

/// Session and history operations exposed to the API layer.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn ChatStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Every message of a context, oldest first, sessions included.
    pub async fn get_history(&self, context: &ContextId) -> Result<Vec<ChatMessage>> {
        self.store.context_history(context).await
    }

    pub async fn get_session_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| NotabeneError::NotFound(format!("Session {session_id}")))?;
        self.store.session_history(session_id).await
    }

    /// Delete every message of a context, returning how many were removed.
    pub async fn clear_history(&self, context: &ContextId) -> Result<u64> {
        let removed = self.store.clear_context_history(context).await?;
        tracing::info!(context = %context, removed, "Cleared chat history");
        Ok(removed)
    }

    pub async fn create_session(
        &self,
        context: &ContextId,
        title: Option<String>,
    ) -> Result<ChatSession> {
        let session = ChatSession::new(context.key(), title);
        self.store.create_session(&session).await?;
        Ok(session)
    }

    pub async fn list_sessions(&self, context: &ContextId) -> Result<Vec<(ChatSession, u64)>> {
        self.store.list_sessions(context).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        if !self.store.delete_session(session_id).await? {
            return Err(NotabeneError::NotFound(format!("Session {session_id}")));
        }
        Ok(())
    }
}
