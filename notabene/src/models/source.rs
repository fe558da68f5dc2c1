use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested unit of content (a transcript, an extracted document, ...).
///
/// Created by the upstream ingestion pipeline; read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceText {
    pub id: String,
    pub context_id: String,
    pub title: String,
    /// Processed text body. `None` or blank means the source has nothing to
    /// index yet (e.g. still transcribing).
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SourceText {
    pub fn new(
        id: impl Into<String>,
        context_id: impl Into<String>,
        title: impl Into<String>,
        content: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            title: title.into(),
            content,
            created_at: Utc::now(),
        }
    }

    /// The indexable body, if there is one.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
