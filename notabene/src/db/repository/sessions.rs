use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::ChatSession;

use super::MessageRepository;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(conn: &Connection, session: &ChatSession) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO chat_sessions (id, context_id, title, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                session.id.clone(),
                session.context_id.clone(),
                session.title.clone(),
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<ChatSession>> {
        let mut rows = conn
            .query(
                "SELECT id, context_id, title, created_at, updated_at
                 FROM chat_sessions WHERE id = ?1",
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_session(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Sessions of a context with message counts, most recently updated
    /// first. The count rides along in one query to avoid N+1 lookups.
    pub async fn list_for_context(
        conn: &Connection,
        context_id: &str,
    ) -> Result<Vec<(ChatSession, u64)>> {
        let mut rows = conn
            .query(
                "SELECT s.id, s.context_id, s.title, s.created_at, s.updated_at,
                        (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
                 FROM chat_sessions s
                 WHERE s.context_id = ?1
                 ORDER BY s.updated_at DESC",
                params![context_id],
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            let session = Self::row_to_session(&row)?;
            let count: u64 = row.get::<i64>(5)?.max(0) as u64;
            sessions.push((session, count));
        }
        Ok(sessions)
    }

    pub async fn rename(
        conn: &Connection,
        id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = conn
            .execute(
                "UPDATE chat_sessions SET title = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, title, updated_at.to_rfc3339()],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Delete a session and its messages. The message delete is explicit
    /// rather than relying on the foreign-key pragma being enabled.
    pub async fn delete(conn: &Connection, id: &str) -> Result<bool> {
        MessageRepository::delete_for_session(conn, id).await?;
        let affected = conn
            .execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])
            .await?;
        Ok(affected > 0)
    }

    fn row_to_session(row: &libsql::Row) -> Result<ChatSession> {
        Ok(ChatSession {
            id: row.get(0)?,
            context_id: row.get(1)?,
            title: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(3)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(4)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
