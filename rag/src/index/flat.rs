//! Exact flat index with squared Euclidean distance.

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::{RagError, Result};

use super::{Neighbor, VectorIndex};

/// Brute-force index over row-major vectors.
///
/// Every search scans all vectors in parallel with rayon; corpora of a few thousand chunks keep
/// this well under a millisecond per query and the ranking is exact.
///
/// # Example
///
/// ```rust
/// use shelf_rag::index::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::build(2, vec![vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
/// let hits = index.search(&[3.0, 3.0], 1).unwrap();
/// assert_eq!(hits[0].index, 1);
/// assert!((hits[0].distance - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimension` components.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Builds an index from scratch, keeping the input order as positions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if any vector has the wrong length.
    pub fn build(dimension: usize, vectors: impl IntoIterator<Item = Vec<f32>>) -> Result<Self> {
        let mut index = Self::new(dimension);
        for vector in vectors {
            index.add(&vector)?;
        }
        Ok(index)
    }

    /// Rebuilds an index from its row-major representation.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Serialization`] when `data` is not a whole number of rows.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        let ragged = if dimension == 0 {
            !data.is_empty()
        } else {
            data.len() % dimension != 0
        };
        if ragged {
            return Err(RagError::Serialization(format!(
                "{} values do not form rows of dimension {dimension}",
                data.len()
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Returns the row-major vector data.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Returns the vector stored at `position`.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start.checked_add(self.dimension)?)
    }

    /// Counts stored vectors whose components are all zero.
    #[must_use]
    pub fn zero_vectors(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data
            .chunks_exact(self.dimension)
            .filter(|row| row.iter().all(|value| *value == 0.0))
            .count()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum()
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension || self.dimension == 0 {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        // Non-finite components would poison every distance computed against this row.
        self.data.extend(
            vector
                .iter()
                .map(|value| if value.is_finite() { *value } else { 0.0 }),
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(RagError::InvalidTopK(k));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, row)| Neighbor {
                distance: squared_l2(row, query),
                index,
            })
            .collect();

        neighbors.sort_unstable_by_key(|n| (OrderedFloat(n.distance), n.index));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }
}
