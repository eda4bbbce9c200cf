//! Vector index implementations for RAG.
//!
//! This module provides the [`VectorIndex`] trait and the [`FlatIndex`]
//! implementation for exact nearest neighbor search.

mod flat;

pub use flat::FlatIndex;

use serde::Serialize;

use crate::error::Result;

/// A nearest-neighbour hit: a position in the index and its distance to the query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Neighbor {
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    /// Position of the vector, aligned with the chunk list.
    pub index: usize,
}

/// Trait for vector index implementations.
///
/// Positions are assigned in insertion order and never change, so position `i` always refers
/// to the `i`-th chunk of the store that owns the index.
pub trait VectorIndex: Send + Sync {
    /// Appends a vector at the next position.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) when the
    /// vector length differs from [`dimension`](VectorIndex::dimension).
    fn add(&mut self, vector: &[f32]) -> Result<()>;

    /// Returns the `k` closest vectors by ascending distance, or all of them when the index
    /// holds fewer than `k`. An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`](crate::RagError::InvalidTopK) for `k == 0` and
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) for a query of the
    /// wrong length.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns `true` if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Converts a distance into a similarity in `(0, 1]`, where identical vectors score 1.
#[must_use]
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_one_at_zero_distance() {
        assert!((distance_to_score(0.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn score_decreases_with_distance() {
        let near = distance_to_score(0.5);
        let far = distance_to_score(4.0);
        assert!(near > far);
        assert!(far > 0.0);
        assert!((far - 0.2).abs() < f32::EPSILON);
    }
}
