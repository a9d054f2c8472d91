//! Full re-embedding of a collection into a fresh `FlatL2Index`.
//!
//! Appending to a flat index costs about as much as rebuilding it, so every
//! ingestion batch re-embeds the whole collection. The result is returned to
//! the caller unpublished; a failure leaves nothing half-built behind.

use tracing::{debug, warn};

use ragstore_core::error::{Error, Result};
use ragstore_core::traits::Embedder;
use ragstore_core::types::{Document, SearchHit, SourceKind};

use crate::flat::FlatL2Index;

#[derive(Debug)]
pub struct Rebuilt {
    pub index: FlatL2Index,
    /// Offsets into `incoming` that were embedded, in order. Their rows follow
    /// the rows of `existing`.
    pub kept: Vec<usize>,
    /// Offsets into `incoming` the embedder failed on, with the reason.
    pub rejected: Vec<(usize, String)>,
}

/// Embed `existing` followed by `incoming` and index all of them.
///
/// A failure on an `incoming` document only drops that document. A failure
/// on an `existing` document, or any vector whose length disagrees with
/// `expected_dim` (or with the first vector when no dimension is established
/// yet), aborts the rebuild.
pub fn rebuild(existing: &[Document], incoming: &[Document], embedder: &dyn Embedder, expected_dim: Option<usize>) -> Result<Rebuilt> {
    let mut vectors = Vec::with_capacity(existing.len() + incoming.len());
    for (pos, doc) in existing.iter().enumerate() {
        let v = embedder.embed_text(&doc.content).map_err(|e| Error::Embedding(format!("position {pos}: {e}")))?;
        vectors.push(v);
    }
    let mut kept = Vec::with_capacity(incoming.len());
    let mut rejected = Vec::new();
    for (offset, doc) in incoming.iter().enumerate() {
        match embedder.embed_text(&doc.content) {
            Ok(v) => { vectors.push(v); kept.push(offset); }
            Err(e) => { warn!("Embedding failed for incoming document {}: {}", offset, e); rejected.push((offset, e.to_string())); }
        }
    }
    let index = FlatL2Index::from_vectors(vectors, expected_dim)?;
    debug!("Rebuilt flat index: {} rows, dim {:?}", index.len(), index.dimension());
    Ok(Rebuilt { index, kept, rejected })
}

/// Embed `query` and return the `k` nearest positions.
///
/// An index with no rows answers with no hits without calling the embedder.
pub fn search_text(index: &FlatL2Index, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<SearchHit>> {
    if index.is_empty() || k == 0 { return Ok(Vec::new()); }
    let q_vec = embedder.embed_text(query).map_err(|e| Error::Embedding(format!("query: {e}")))?;
    let hits = index.search(&q_vec, k)?;
    Ok(hits.into_iter().map(|(position, distance)| SearchHit { position, score: distance, source: SourceKind::Dense }).collect())
}
