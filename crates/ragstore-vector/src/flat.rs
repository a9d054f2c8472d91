use serde::{Deserialize, Serialize};

use ragstore_core::error::{Error, Result};
use ragstore_core::types::Position;

/// Exact nearest-neighbour index: every query is compared against every row.
///
/// Rows are stored row-major in one buffer; row `i` is the embedding of the
/// document at position `i`. The dimension is `None` only while no vector has
/// ever been indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn empty() -> Self { Self::default() }

    /// Build from one vector per position. Every vector must have the same
    /// length, and that length must equal `expected_dim` when one is given.
    pub fn from_vectors(vectors: Vec<Vec<f32>>, expected_dim: Option<usize>) -> Result<Self> {
        let dim = match expected_dim.or_else(|| vectors.first().map(Vec::len)) {
            Some(dim) => dim,
            None => return Ok(Self::empty()),
        };
        if dim == 0 && !vectors.is_empty() { return Err(Error::Embedding("embedder returned an empty vector".into())); }
        let mut data = Vec::with_capacity(dim * vectors.len());
        for v in vectors {
            if v.len() != dim { return Err(Error::DimensionMismatch { expected: dim, actual: v.len() }); }
            data.extend_from_slice(&v);
        }
        Ok(Self { dimension: Some(dim), data })
    }

    /// Rehydrate from a stored buffer, checking it divides into whole rows.
    pub fn from_parts(dimension: Option<usize>, data: Vec<f32>) -> Option<Self> {
        match dimension {
            None if data.is_empty() => Some(Self::empty()),
            Some(dim) if dim > 0 && data.len() % dim == 0 => Some(Self { dimension: Some(dim), data }),
            _ => None,
        }
    }

    pub fn dimension(&self) -> Option<usize> { self.dimension }

    pub fn len(&self) -> usize {
        match self.dimension { Some(dim) if dim > 0 => self.data.len() / dim, _ => 0 }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn vector(&self, position: Position) -> Option<&[f32]> {
        let dim = self.dimension?;
        self.data.get(position * dim..(position + 1) * dim)
    }

    pub(crate) fn raw(&self) -> &[f32] { &self.data }

    /// The `k` rows closest to `query` by squared Euclidean distance,
    /// ascending; equal distances keep position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Position, f32)>> {
        let Some(dim) = self.dimension else { return Ok(Vec::new()) };
        if self.is_empty() { return Ok(Vec::new()); }
        if query.len() != dim { return Err(Error::DimensionMismatch { expected: dim, actual: query.len() }); }
        let mut scored: Vec<(Position, f32)> = self
            .data
            .chunks_exact(dim)
            .enumerate()
            .map(|(pos, row)| (pos, squared_l2(row, query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
