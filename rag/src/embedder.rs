//! Deterministic offline embedder.

use sha2::{Digest, Sha256};

use shelf_core::EmbeddingModel;

/// Embeds text by spreading its SHA-256 hex digest over the vector, then L2-normalising.
///
/// Component `i` is `(digest[i % 64] as f32 / 255.0) - 0.5`. Equal texts map to equal vectors
/// and nothing else is similar in any meaningful way, so this is for tests, demos and
/// air-gapped smoke runs where no embedding server is reachable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashEmbedding {
    dimension: usize,
    model_id: String,
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashEmbedding {
    /// Creates a hash embedder producing `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("sha256-hash-{dimension}"),
        }
    }

    /// Computes the vector synchronously.
    #[must_use]
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let digest = digest.as_bytes();

        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|i| f32::from(digest[i % digest.len()]) / 255.0 - 0.5)
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl EmbeddingModel for HashEmbedding {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> shelf_core::Result<Vec<f32>> {
        Ok(self.vector(text))
    }
}
