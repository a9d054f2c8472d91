//! Merge of ranked result lists into one deduplicated list.

use std::collections::HashSet;

use ragstore_core::error::Result;
use ragstore_core::normalize::content_hash;
use ragstore_core::types::Document;

/// Concatenate `sources` in the order given, keeping the first occurrence of
/// each content hash, and stop at `k` documents.
///
/// Callers pass sources in precedence order; the engine uses primary dense,
/// primary keyword, then the other collection's dense and keyword hits.
pub fn fuse(sources: &[Vec<Document>], k: usize) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(k.min(sources.iter().map(Vec::len).sum()));
    for doc in sources.iter().flatten() {
        if merged.len() >= k { break; }
        if seen.insert(content_hash(&doc.content)) { merged.push(doc.clone()); }
    }
    merged
}

/// Anything that can answer "the `k` most relevant documents for this text".
pub trait Retriever: Send + Sync {
    fn search(&self, text: &str, k: usize) -> Result<Vec<Document>>;
}
