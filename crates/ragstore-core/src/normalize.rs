//! Content normalization and hashing.
//!
//! Every document is normalized exactly once on ingestion; the stored content
//! is the normalized form, and the content hash is always taken over it.

use crate::types::ContentHash;

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() { out.push(' '); }
        out.push_str(word);
    }
    out
}

/// Hash of the normalized form of `text`.
pub fn content_hash(text: &str) -> ContentHash {
    let h = blake3::hash(normalize(text).as_bytes());
    ContentHash::from_hex(h.to_hex().to_string())
}
