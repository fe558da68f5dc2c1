use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{ChatMessage, ChatRole, MessageMetadata};

const MESSAGE_COLUMNS: &str = "id, context_id, session_id, role, content, metadata, created_at";

pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(conn: &Connection, message: &ChatMessage) -> Result<()> {
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO chat_messages (id, context_id, session_id, role, content, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                message.id.clone(),
                message.context_id.clone(),
                message.session_id.clone(),
                message.role.to_string(),
                message.content.clone(),
                metadata_json,
                message.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn list_for_context(
        conn: &Connection,
        context_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE context_id = ?1 ORDER BY created_at ASC"
        );
        let mut rows = conn.query(&sql, params![context_id]).await?;
        Self::collect(&mut rows).await
    }

    pub async fn list_ungrouped(conn: &Connection, context_id: &str) -> Result<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE context_id = ?1 AND session_id IS NULL ORDER BY created_at ASC"
        );
        let mut rows = conn.query(&sql, params![context_id]).await?;
        Self::collect(&mut rows).await
    }

    pub async fn list_for_session(
        conn: &Connection,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE session_id = ?1 ORDER BY created_at ASC"
        );
        let mut rows = conn.query(&sql, params![session_id]).await?;
        Self::collect(&mut rows).await
    }

    pub async fn delete_for_context(conn: &Connection, context_id: &str) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM chat_messages WHERE context_id = ?1",
                params![context_id],
            )
            .await?;
        Ok(affected)
    }

    pub async fn delete_for_session(conn: &Connection, session_id: &str) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM chat_messages WHERE session_id = ?1",
                params![session_id],
            )
            .await?;
        Ok(affected)
    }

    async fn collect(rows: &mut libsql::Rows) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(Self::row_to_message(&row)?);
        }
        Ok(messages)
    }

    fn row_to_message(row: &libsql::Row) -> Result<ChatMessage> {
        let metadata: Option<MessageMetadata> = row
            .get::<Option<String>>(5)?
            .and_then(|raw| serde_json::from_str(&raw).ok());

        Ok(ChatMessage {
            id: row.get(0)?,
            context_id: row.get(1)?,
            session_id: row.get(2)?,
            role: row
                .get::<String>(3)?
                .parse::<ChatRole>()
                .unwrap_or(ChatRole::User),
            content: row.get(4)?,
            metadata,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(6)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
