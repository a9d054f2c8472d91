//! Hybrid retrieval over two collections: dense + keyword search, fused with
//! a fixed precedence and deduplicated by content.

pub mod classify;
pub mod engine;
pub mod fusion;

pub use classify::KeywordClassifier;
pub use engine::{CollectionRetriever, CollectionStats, CompactReport, Engine, EngineStats, IngestReport};
pub use fusion::{fuse, Retriever};
