//! ragstore-vector
//!
//! Exact dense retrieval for one collection: a brute-force squared-L2 index,
//! the full-rebuild routine that feeds it, and its on-disk snapshot format.

pub mod flat;
pub mod rebuild;
pub mod snapshot;

pub use flat::FlatL2Index;
pub use rebuild::{rebuild, search_text, Rebuilt};
pub use snapshot::CollectionSnapshot;
