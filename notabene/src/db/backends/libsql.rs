use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{MessageRepository, SessionRepository, SourceRepository};
use crate::db::traits::{MessageStore, SessionStore, SourceStore};
use crate::error::Result;
use crate::models::{ChatMessage, ChatSession, ContextId, SourceText};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SourceStore for LibSqlBackend {
    async fn create_source(&self, source: &SourceText) -> Result<()> {
        let conn = self.db.connect()?;
        SourceRepository::create(&conn, source).await
    }

    async fn sources_for_context(&self, context: &ContextId) -> Result<Vec<SourceText>> {
        let conn = self.db.connect()?;
        SourceRepository::list_for_context(&conn, &context.key()).await
    }
}

#[async_trait]
impl MessageStore for LibSqlBackend {
    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let conn = self.db.connect()?;
        MessageRepository::create(&conn, message).await
    }

    async fn context_history(&self, context: &ContextId) -> Result<Vec<ChatMessage>> {
        let conn = self.db.connect()?;
        MessageRepository::list_for_context(&conn, &context.key()).await
    }

    async fn ungrouped_history(&self, context: &ContextId) -> Result<Vec<ChatMessage>> {
        let conn = self.db.connect()?;
        MessageRepository::list_ungrouped(&conn, &context.key()).await
    }

    async fn session_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.db.connect()?;
        MessageRepository::list_for_session(&conn, session_id).await
    }

    async fn clear_context_history(&self, context: &ContextId) -> Result<u64> {
        let conn = self.db.connect()?;
        MessageRepository::delete_for_context(&conn, &context.key()).await
    }
}

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        let conn = self.db.connect()?;
        SessionRepository::create(&conn, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>> {
        let conn = self.db.connect()?;
        SessionRepository::get_by_id(&conn, id).await
    }

    async fn list_sessions(&self, context: &ContextId) -> Result<Vec<(ChatSession, u64)>> {
        let conn = self.db.connect()?;
        SessionRepository::list_for_context(&conn, &context.key()).await
    }

    async fn rename_session(
        &self,
        id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        SessionRepository::rename(&conn, id, title, updated_at).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        SessionRepository::delete(&conn, id).await
    }
}
