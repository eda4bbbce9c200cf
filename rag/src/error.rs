//! Error types for the RAG crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A search asked for zero results.
    #[error("top_k must be a positive integer, got {0}")]
    InvalidTopK(usize),

    /// Dimension mismatch between embedding and index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// Chunks, metadata and vectors are not positionally aligned.
    #[error("length mismatch: {chunks} chunks, {metadata} metadata records, {vectors} vectors")]
    LengthMismatch {
        /// Number of chunk texts.
        chunks: usize,
        /// Number of metadata records.
        metadata: usize,
        /// Number of indexed vectors.
        vectors: usize,
    },

    /// The persisted store was built with a different embedding model.
    #[error("store was built with embedding model `{stored}`, configured model is `{configured}`")]
    ModelMismatch {
        /// Model recorded in the persisted store.
        stored: String,
        /// Model of the configured embedder.
        configured: String,
    },

    /// Persistence operation failed.
    #[error("persistence error at {path}: {source}")]
    Persistence {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// PDF extraction failed during ingestion.
    #[error(transparent)]
    Pdf(#[from] shelf_pdf::PdfError),

    /// The operation needs an embedding model and none is configured.
    #[error("no embedding model is configured")]
    EmbedderUnavailable,

    /// Every chunk of a rebuild failed to embed.
    #[error("embedding failed for all {chunks} chunks, keeping the previous store")]
    EmbeddingFailed {
        /// Number of chunks submitted.
        chunks: usize,
    },

    /// Ingestion found no usable text.
    #[error("no ingestible text found in {0}")]
    EmptyCorpus(PathBuf),
}

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
