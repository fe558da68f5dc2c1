use async_trait::async_trait;

use crate::error::{NotabeneError, Result};

/// Embedding provider seam.
///
/// Contract: the returned list has the same length and order as `texts`.
/// Implementations must surface a rejected credential as
/// [`NotabeneError::ApiAuth`] so callers can distinguish it from a generic
/// provider failure.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| NotabeneError::Embedding("No embedding generated".to_string()))
    }
}
