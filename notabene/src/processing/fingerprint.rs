use sha2::{Digest, Sha256};

use crate::models::SourceText;

/// Digest length kept short: the fingerprint is a change-detection token,
/// not a content hash.
const FINGERPRINT_LEN: usize = 12;

/// Derive a stable, order-independent fingerprint for a set of source ids.
///
/// Adding or removing a member changes the fingerprint even when the chunk
/// text would be identical across runs; an unchanged member set always maps
/// to the same fingerprint.
pub fn fingerprint_ids<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for id in &sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }

    let digest = hasher.finalize();
    let mut hex: String = digest
        .iter()
        .take(FINGERPRINT_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Fingerprint of a source set by member ids.
pub fn fingerprint_sources(sources: &[SourceText]) -> String {
    let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
    fingerprint_ids(&ids)
}
