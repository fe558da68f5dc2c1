use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotabeneError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl NotabeneError {
    /// True when the error means a provider rejected the credential, as
    /// opposed to a transient or generic provider failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, NotabeneError::ApiAuth(_))
    }
}

impl IntoResponse for NotabeneError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NotabeneError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            NotabeneError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            NotabeneError::Configuration(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            NotabeneError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            NotabeneError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            NotabeneError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            NotabeneError::ApiAuth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            NotabeneError::ApiRateLimit { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            NotabeneError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            NotabeneError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            NotabeneError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, NotabeneError>;
