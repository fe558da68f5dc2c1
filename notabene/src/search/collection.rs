use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::Mutex as AsyncMutex;

/// One embedded chunk stored in a collection.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub source_id: String,
    pub source_title: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// The embedded form of all chunks for one context, tagged with the source
/// set fingerprint it was built from. Collections are immutable once
/// published; a stale fingerprint replaces the whole collection.
#[derive(Debug)]
pub struct Collection {
    fingerprint: String,
    chunks: Vec<IndexedChunk>,
}

impl Collection {
    pub fn new(fingerprint: impl Into<String>, chunks: Vec<IndexedChunk>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            chunks,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    /// Case-insensitive substring scan over every stored chunk, in storage
    /// order.
    pub fn keyword_scan(&self, query: &str) -> Vec<&IndexedChunk> {
        let needle = query.to_lowercase();
        self.chunks
            .iter()
            .filter(|chunk| chunk.text.to_lowercase().contains(&needle))
            .collect()
    }

    /// Nearest chunks to `query` by cosine distance, ascending. Returns at
    /// most `k` `(chunk, distance)` pairs.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(&IndexedChunk, f32)> {
        let mut scored: Vec<(&IndexedChunk, f32)> = self
            .chunks
            .iter()
            .map(|chunk| (chunk, cosine_distance(query, &chunk.embedding)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity in [-1, 1]; zero-norm vectors compare as orthogonal.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance as reported to callers; similarity is `1 - distance`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Process-wide table of collections keyed by context. Reads hand out a
/// stable `Arc<Collection>` snapshot without blocking writers; writes to
/// one context are serialized through a per-key async lock so a reader can
/// never observe a half-replaced collection.
///
/// Nothing here survives a restart; the fingerprint check makes the forced
/// re-index on next use cheap to reach.
#[derive(Default)]
pub struct CollectionSet {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    write_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CollectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Collection>> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, collection: Collection) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(collection));
    }

    pub fn remove(&self, key: &str) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Per-key lock guarding rebuilds of one context's collection.
    pub fn write_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            source_id: "src_1".to_string(),
            source_title: "Notes".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_keyword_scan_is_case_insensitive() {
        let collection = Collection::new(
            "fp",
            vec![
                chunk("The Mitochondria is here", vec![1.0, 0.0]),
                chunk("unrelated", vec![0.0, 1.0]),
            ],
        );
        let hits = collection.keyword_scan("mitochondria");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("Mitochondria"));
    }

    #[test]
    fn test_nearest_orders_by_distance() {
        let collection = Collection::new(
            "fp",
            vec![
                chunk("far", vec![0.0, 1.0]),
                chunk("near", vec![1.0, 0.0]),
                chunk("middle", vec![0.7, 0.7]),
            ],
        );
        let results = collection.nearest(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "near");
        assert_eq!(results[1].0.text, "middle");
        assert!(results[0].1 <= results[1].1);
    }

    #[test]
    fn test_collection_set_replaces_snapshots() {
        let set = CollectionSet::new();
        set.insert("doc_1", Collection::new("fp1", Vec::new()));
        let first = set.get("doc_1").unwrap();
        assert_eq!(first.fingerprint(), "fp1");

        set.insert("doc_1", Collection::new("fp2", Vec::new()));
        // The old snapshot stays valid for readers holding it.
        assert_eq!(first.fingerprint(), "fp1");
        assert_eq!(set.get("doc_1").unwrap().fingerprint(), "fp2");
    }

    #[test]
    fn test_write_lock_is_shared_per_key() {
        let set = CollectionSet::new();
        let a = set.write_lock("doc_1");
        let b = set.write_lock("doc_1");
        assert!(Arc::ptr_eq(&a, &b));
        let c = set.write_lock("doc_2");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
