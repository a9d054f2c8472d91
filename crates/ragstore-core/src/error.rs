use std::path::PathBuf;

use thiserror::Error;

use crate::types::Collection;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Collection '{0}' has no published index")]
    NotInitialized(Collection),

    #[error("No relevant results")]
    NoResults,

    #[error("Document {batch_index} in batch skipped: {reason}")]
    IngestionPartialFailure { batch_index: usize, reason: String },

    #[error("Storage unavailable at {}: {source}", path.display())]
    PersistenceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt snapshot at {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Engine lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceUnavailable { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot { path: path.into(), reason: reason.into() }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self { Self::LockPoisoned }
}

pub type Result<T> = std::result::Result<T, Error>;
