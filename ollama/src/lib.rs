//! Ollama embedding adapter for shelf, built on `reqwest` and the shared `shelf-core`
//! abstractions.
//!
//! ```no_run
//! use shelf_core::EmbeddingModel;
//! use shelf_ollama::{OllamaConfig, OllamaEmbedding};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let embedder = OllamaEmbedding::new(OllamaConfig::default().with_env_overrides())?;
//! let vector = embedder.embed("library opening hours").await?;
//! assert_eq!(vector.len(), embedder.dim());
//! # Ok(()) }
//! ```

mod config;
mod embedding;
mod error;

pub use config::{BASE_URL_ENV, MODEL_ENV, OllamaConfig};
pub use embedding::OllamaEmbedding;
pub use error::OllamaError;

/// Base URL of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Embedding model used when none is configured.
pub const DEFAULT_MODEL: &str = "all-minilm:latest";
/// Vector dimension of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSION: usize = 384;
/// Request timeout in seconds; first calls may load the model.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
