use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::error::{NotabeneError, Result};
use crate::models::{ContextId, SourceText};
use crate::processing::{fingerprint_sources, TextChunker};
use crate::search::{Collection, CollectionSet, IndexedChunk};

/// Builds and refreshes the per-context vector collections.
///
/// Indexing is idempotent per source set: the collection is tagged with the
/// fingerprint of its member source ids, and a call with an unchanged set
/// returns without touching the embedding provider. A stale fingerprint
/// always rebuilds the collection in full.
pub struct Indexer {
    collections: Arc<CollectionSet>,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
}

impl Indexer {
    pub fn new(
        collections: Arc<CollectionSet>,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            collections,
            embedder,
            chunker: TextChunker::new(config),
        }
    }

    /// Ensure `context`'s collection reflects exactly `sources`. Returns the
    /// collection key.
    pub async fn index(&self, context: &ContextId, sources: &[SourceText]) -> Result<String> {
        let key = context.key();
        let fingerprint = fingerprint_sources(sources);

        if self.is_current(&key, &fingerprint) {
            tracing::debug!(context = %key, "Sources already indexed");
            return Ok(key);
        }

        let lock = self.collections.write_lock(&key);
        let _guard = lock.lock().await;

        // Another writer may have finished the same rebuild while we waited.
        if self.is_current(&key, &fingerprint) {
            return Ok(key);
        }

        self.collections.remove(&key);

        let mut texts: Vec<String> = Vec::new();
        let mut chunk_meta: Vec<(String, String, usize)> = Vec::new();

        for source in sources {
            let Some(body) = source.text() else {
                continue;
            };
            for (i, chunk) in self.chunker.chunk(body).into_iter().enumerate() {
                texts.push(chunk);
                chunk_meta.push((source.id.clone(), source.title.clone(), i));
            }
        }

        if texts.is_empty() {
            // Record the empty collection so searches return no results
            // instead of erroring.
            tracing::warn!(context = %key, "No content to index");
            self.collections
                .insert(key.clone(), Collection::new(fingerprint, Vec::new()));
            return Ok(key);
        }

        let embeddings = self.embedder.embed(texts.clone()).await?;
        if embeddings.len() != texts.len() {
            return Err(NotabeneError::Embedding(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let chunks: Vec<IndexedChunk> = chunk_meta
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .map(
                |(((source_id, source_title, chunk_index), text), embedding)| IndexedChunk {
                    source_id,
                    source_title,
                    chunk_index,
                    text,
                    embedding,
                },
            )
            .collect();

        tracing::info!(
            context = %key,
            chunk_count = chunks.len(),
            source_count = sources.len(),
            "Indexed sources"
        );

        self.collections
            .insert(key.clone(), Collection::new(fingerprint, chunks));

        Ok(key)
    }

    fn is_current(&self, key: &str, fingerprint: &str) -> bool {
        self.collections
            .get(key)
            .is_some_and(|collection| collection.fingerprint() == fingerprint)
    }
}
