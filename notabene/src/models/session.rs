use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Title given to a session until the first exchange produces a real one.
pub const DEFAULT_SESSION_TITLE: &str = "New conversation";

/// A named grouping of messages for one context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub context_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(context_id: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: nanoid!(),
            context_id: context_id.into(),
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults_title() {
        let session = ChatSession::new("project_1", None);
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_blank_title_falls_back_to_placeholder() {
        let session = ChatSession::new("project_1", Some("   ".to_string()));
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
    }
}
