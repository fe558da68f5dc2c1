use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::models::{ContextId, RetrievedChunk};
use crate::search::CollectionSet;

/// Tool result fed back to the model when a search finds nothing.
pub const NO_RESULTS_MESSAGE: &str = "No results found in the sources.";
/// Tool result fed back to the model when a search fails outright.
pub const SEARCH_FAILED_MESSAGE: &str = "Error while searching the sources.";

/// One chunk returned for a query.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub source_id: String,
    pub source_title: String,
    pub content: String,
    pub score: f32,
}

/// Answers free-text queries against a context's collection.
///
/// Two phases, in order: a case-insensitive keyword scan whose hits are
/// unambiguous evidence (fixed score 1.0) and short-circuit the vector
/// phase entirely; then embedding similarity with a relevance floor.
pub struct Retriever {
    collections: Arc<CollectionSet>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        collections: Arc<CollectionSet>,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            collections,
            embedder,
            min_score: config.min_score,
        }
    }

    pub async fn search(
        &self,
        context: &ContextId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>> {
        let key = context.key();
        let Some(collection) = self.collections.get(&key) else {
            tracing::warn!(context = %key, "Collection not found");
            return Ok(Vec::new());
        };

        tracing::debug!(
            context = %key,
            query,
            total_chunks = collection.len(),
            "Search starting"
        );

        let keyword_hits: Vec<ChunkHit> = collection
            .keyword_scan(query)
            .into_iter()
            .take(top_k)
            .map(|chunk| ChunkHit {
                source_id: chunk.source_id.clone(),
                source_title: chunk.source_title.clone(),
                content: chunk.text.clone(),
                score: 1.0,
            })
            .collect();

        if !keyword_hits.is_empty() {
            tracing::debug!(count = keyword_hits.len(), query, "Returning keyword matches");
            return Ok(keyword_hits);
        }

        tracing::debug!(query, "No keyword matches, falling back to semantic search");

        let query_embedding = self.embedder.embed_single(query).await?;

        let hits = collection
            .nearest(&query_embedding, top_k)
            .into_iter()
            .map(|(chunk, distance)| ChunkHit {
                source_id: chunk.source_id.clone(),
                source_title: chunk.source_title.clone(),
                content: chunk.text.clone(),
                score: 1.0 - distance,
            })
            .filter(|hit| hit.score >= self.min_score)
            .collect();

        Ok(hits)
    }
}

/// Format hits for the model and the UI.
///
/// Returns the tool-result text handed back to the model, the distinct
/// source titles in first-seen order, and the full chunk records carried on
/// the `search_complete` event.
pub fn format_search_results(
    hits: &[ChunkHit],
    query: &str,
) -> (String, Vec<String>, Vec<RetrievedChunk>) {
    if hits.is_empty() {
        return (NO_RESULTS_MESSAGE.to_string(), Vec::new(), Vec::new());
    }

    let mut source_titles: Vec<String> = Vec::new();
    for hit in hits {
        if !source_titles.contains(&hit.source_title) {
            source_titles.push(hit.source_title.clone());
        }
    }

    let chunks: Vec<RetrievedChunk> = hits
        .iter()
        .map(|hit| RetrievedChunk::new(&hit.source_title, &hit.content, query, hit.score))
        .collect();

    let mut parts = vec!["Relevant excerpts from the sources:".to_string()];
    for (i, hit) in hits.iter().enumerate() {
        parts.push(format!("\n[{}] {}:", i + 1, hit.source_title));
        parts.push(hit.content.clone());
    }

    (parts.join("\n"), source_titles, chunks)
}
