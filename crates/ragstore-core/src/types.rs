//! Domain types shared by the keyword, dense and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type Meta = HashMap<String, String>;

/// Ordinal of a document within its collection. Doubles as the document's
/// identity in the docstore, the dense index rows and the keyword postings.
pub type Position = usize;

/// An already-chunked unit of text.
///
/// - `content`: the text payload; normalized once accepted by the engine
/// - `metadata`: free-form string pairs carried through to query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Meta::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One of the two independent document partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    General,
    Domain,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::General, Collection::Domain];

    pub fn other(self) -> Self {
        match self {
            Self::General => Self::Domain,
            Self::Domain => Self::General,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Collection {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "domain" | "law" => Ok(Self::Domain),
            other => Err(crate::error::Error::InvalidConfig(format!("unknown collection '{other}'"))),
        }
    }
}

/// Lowercase hex blake3 digest of normalized content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub(crate) fn from_hex(hex: String) -> Self { Self(hex) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Indicates which index produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Keyword,
}

/// A positional hit from one index.
///
/// `score` is index-specific: squared L2 distance for `Dense` (lower is
/// better), matched query-term count for `Keyword` (higher is better).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub position: Position,
    pub score: f32,
    pub source: SourceKind,
}
