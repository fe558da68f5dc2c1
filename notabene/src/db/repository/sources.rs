use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::SourceText;

pub struct SourceRepository;

impl SourceRepository {
    pub async fn create(conn: &Connection, source: &SourceText) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO sources (id, context_id, title, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                source.id.clone(),
                source.context_id.clone(),
                source.title.clone(),
                source.content.clone(),
                source.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn list_for_context(
        conn: &Connection,
        context_id: &str,
    ) -> Result<Vec<SourceText>> {
        let mut rows = conn
            .query(
                "SELECT id, context_id, title, content, created_at
                 FROM sources WHERE context_id = ?1
                 ORDER BY created_at ASC",
                params![context_id],
            )
            .await?;

        let mut sources = Vec::new();
        while let Some(row) = rows.next().await? {
            sources.push(Self::row_to_source(&row)?);
        }
        Ok(sources)
    }

    fn row_to_source(row: &libsql::Row) -> Result<SourceText> {
        Ok(SourceText {
            id: row.get(0)?,
            context_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(4)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
