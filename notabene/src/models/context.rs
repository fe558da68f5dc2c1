use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NotabeneError;

/// The retrieval scope a conversation runs against: one document's source
/// set or a whole project's source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Document,
    Project,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Document => write!(f, "document"),
            ContextKind::Project => write!(f, "project"),
        }
    }
}

impl FromStr for ContextKind {
    type Err = NotabeneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" => Ok(ContextKind::Document),
            "project" => Ok(ContextKind::Project),
            other => Err(NotabeneError::Validation(format!(
                "Unknown context kind: {other}"
            ))),
        }
    }
}

/// Identifies one retrieval context. The key doubles as the collection name
/// and as the `context_id` column in persisted messages and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId {
    pub kind: ContextKind,
    pub id: String,
}

impl ContextId {
    pub fn document(id: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Document,
            id: id.into(),
        }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Project,
            id: id.into(),
        }
    }

    /// Stable storage/collection key, e.g. `doc_41` or `project_7`.
    pub fn key(&self) -> String {
        match self.kind {
            ContextKind::Document => format!("doc_{}", self.id),
            ContextKind::Project => format!("project_{}", self.id),
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
