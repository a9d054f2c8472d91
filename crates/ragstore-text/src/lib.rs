//! ragstore-text
//!
//! Keyword inverted index: token -> positions, one index per collection.
//! Tokenization goes through a tantivy analyzer; ranking is a plain
//! matched-term count.

pub mod index;
pub mod tantivy_utils;

pub use index::KeywordIndex;
