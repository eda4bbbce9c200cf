//! Embedder selection for the CLI.

use std::fmt;

use anyhow::{Context, Result};
use clap::ValueEnum;
use shelf_core::{Embedding, EmbeddingModel, Result as CoreResult};
use shelf_ollama::{OllamaConfig, OllamaEmbedding};
use shelf_rag::{HashEmbedding, RagConfig};

/// Supported embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmbedderKind {
    /// Deterministic SHA-256 hash vectors; works offline.
    #[default]
    Hash,
    /// A local or remote Ollama server.
    Ollama,
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl EmbedderKind {
    /// Creates the embedder, taking the Ollama model and its dimension from `config`.
    pub fn create(self, config: &RagConfig) -> Result<Embedder> {
        Ok(match self {
            Self::Hash => Embedder::from(HashEmbedding::default()),
            Self::Ollama => {
                let ollama = OllamaConfig::default()
                    .with_model(config.embedding_model.clone(), config.embedding_dimension)
                    .with_env_overrides();
                Embedder::from(
                    OllamaEmbedding::new(ollama).context("failed to create the Ollama client")?,
                )
            }
        })
    }
}

/// One of the supported embedders behind a single [`EmbeddingModel`].
#[derive(Debug, Clone)]
pub enum Embedder {
    /// SHA-256 hash vectors.
    Hash(HashEmbedding),
    /// Ollama server.
    Ollama(OllamaEmbedding),
}

impl From<HashEmbedding> for Embedder {
    fn from(inner: HashEmbedding) -> Self {
        Self::Hash(inner)
    }
}

impl From<OllamaEmbedding> for Embedder {
    fn from(inner: OllamaEmbedding) -> Self {
        Self::Ollama(inner)
    }
}

impl EmbeddingModel for Embedder {
    fn dim(&self) -> usize {
        match self {
            Self::Hash(inner) => inner.dim(),
            Self::Ollama(inner) => inner.dim(),
        }
    }

    fn model_id(&self) -> &str {
        match self {
            Self::Hash(inner) => inner.model_id(),
            Self::Ollama(inner) => inner.model_id(),
        }
    }

    async fn embed(&self, text: &str) -> CoreResult<Embedding> {
        match self {
            Self::Hash(inner) => inner.embed(text).await,
            Self::Ollama(inner) => inner.embed(text).await,
        }
    }
}
