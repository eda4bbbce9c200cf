//! Configuration for the retrieval engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// Environment variable overriding [`RagConfig::store_dir`].
pub const STORE_DIR_ENV: &str = "SHELF_STORE_DIR";
/// Environment variable overriding [`RagConfig::embedding_model`].
pub const EMBEDDING_MODEL_ENV: &str = "EMBEDDING_MODEL";
/// Environment variable overriding [`RagConfig::embedding_dimension`].
pub const EMBEDDING_DIMENSION_ENV: &str = "EMBEDDING_DIMENSION";

/// What to do when a persisted store was built with a different embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMismatchPolicy {
    /// Refuse to load the store; it stays unloaded until rebuilt.
    #[default]
    Reject,
    /// Load the store anyway and log a warning.
    Warn,
}

/// Configuration for a [`LibraryRag`](crate::LibraryRag) instance.
///
/// Missing fields take their defaults when read from JSON, so a config file only needs the keys
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Directory holding the persisted store.
    pub store_dir: PathBuf,
    /// Number of results returned when a search does not specify `k`.
    pub default_top_k: usize,
    /// Context budget in characters when none is given.
    pub max_context_length: usize,
    /// Neighbours fetched per query variant, as a multiple of `k`.
    pub over_fetch_factor: usize,
    /// Number of leading characters used to fingerprint duplicate chunks.
    pub fingerprint_chars: usize,
    /// Identifier of the embedding model the store is expected to be built with.
    pub embedding_model: String,
    /// Vector dimension produced by `embedding_model`.
    pub embedding_dimension: usize,
    /// Behaviour when the persisted model differs from `embedding_model`.
    pub model_mismatch: ModelMismatchPolicy,
    /// Number of chunks embedded per request during ingestion.
    pub embed_batch_size: usize,
    /// Chunks written to the debug excerpt on save; zero disables the excerpt.
    pub debug_dump_chunks: usize,
    /// Characters kept per chunk in the debug excerpt.
    pub debug_excerpt_chars: usize,
    /// Ingestion drops paragraphs shorter than this many characters.
    pub min_chunk_chars: usize,
    /// Ingestion packs paragraphs into chunks of at most this many characters.
    pub max_chunk_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("data/vector_store"),
            default_top_k: 5,
            max_context_length: 3000,
            over_fetch_factor: 3,
            fingerprint_chars: 200,
            embedding_model: "all-minilm:latest".to_string(),
            embedding_dimension: 384,
            model_mismatch: ModelMismatchPolicy::Reject,
            embed_batch_size: 5,
            debug_dump_chunks: 20,
            debug_excerpt_chars: 200,
            min_chunk_chars: 30,
            max_chunk_chars: 800,
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }

    /// Reads a JSON configuration file; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Persistence`] if the file cannot be read and [`RagError::Config`] if it
    /// is not valid JSON for this structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RagError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] on malformed input.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| RagError::Config(e.to_string()))
    }

    /// Applies `SHELF_STORE_DIR`, `EMBEDDING_MODEL` and `EMBEDDING_DIMENSION` from the process
    /// environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Empty values, and a dimension that is not a positive integer, are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(STORE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup(EMBEDDING_MODEL_ENV).filter(|v| !v.is_empty()) {
            self.embedding_model = model;
        }
        if let Some(dimension) = lookup(EMBEDDING_DIMENSION_ENV)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&d| d > 0)
        {
            self.embedding_dimension = dimension;
        }
        self
    }

    /// Checks values that would make the engine unusable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("default_top_k", self.default_top_k),
            ("over_fetch_factor", self.over_fetch_factor),
            ("fingerprint_chars", self.fingerprint_chars),
            ("embedding_dimension", self.embedding_dimension),
            ("embed_batch_size", self.embed_batch_size),
            ("max_chunk_chars", self.max_chunk_chars),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(RagError::Config(format!("{field} must be greater than zero")));
        }
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(RagError::Config(format!(
                "min_chunk_chars ({}) exceeds max_chunk_chars ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }
        Ok(())
    }
}

/// Builder for RAG configuration.
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the store directory.
    #[must_use]
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_dir = path.into();
        self
    }

    /// Sets the default number of results to return.
    #[must_use]
    pub const fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Sets the default context budget in characters.
    #[must_use]
    pub const fn max_context_length(mut self, length: usize) -> Self {
        self.config.max_context_length = length;
        self
    }

    /// Sets the per-variant over-fetch multiple.
    #[must_use]
    pub const fn over_fetch_factor(mut self, factor: usize) -> Self {
        self.config.over_fetch_factor = factor;
        self
    }

    /// Sets the fingerprint prefix length used for deduplication.
    #[must_use]
    pub const fn fingerprint_chars(mut self, chars: usize) -> Self {
        self.config.fingerprint_chars = chars;
        self
    }

    /// Sets the expected embedding model identifier.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Sets the vector dimension the embedding model produces.
    #[must_use]
    pub const fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding_dimension = dimension;
        self
    }

    /// Sets the model mismatch policy.
    #[must_use]
    pub const fn model_mismatch(mut self, policy: ModelMismatchPolicy) -> Self {
        self.config.model_mismatch = policy;
        self
    }

    /// Sets the ingestion embedding batch size.
    #[must_use]
    pub const fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Sets how many chunks the debug excerpt contains.
    #[must_use]
    pub const fn debug_dump_chunks(mut self, chunks: usize) -> Self {
        self.config.debug_dump_chunks = chunks;
        self
    }

    /// Sets the per-chunk truncation of the debug excerpt.
    #[must_use]
    pub const fn debug_excerpt_chars(mut self, chars: usize) -> Self {
        self.config.debug_excerpt_chars = chars;
        self
    }

    /// Sets the ingestion chunk size bounds.
    #[must_use]
    pub const fn chunk_chars(mut self, min: usize, max: usize) -> Self {
        self.config.min_chunk_chars = min;
        self.config.max_chunk_chars = max;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RagConfig::default();
        assert_eq!(config.store_dir, PathBuf::from("data/vector_store"));
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.max_context_length, 3000);
        assert_eq!(config.over_fetch_factor, 3);
        assert_eq!(config.fingerprint_chars, 200);
        assert_eq!(config.embedding_model, "all-minilm:latest");
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.model_mismatch, ModelMismatchPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_config() {
        let config = RagConfig::builder()
            .store_dir("/custom/store")
            .default_top_k(10)
            .max_context_length(500)
            .embedding_model("nomic-embed-text")
            .model_mismatch(ModelMismatchPolicy::Warn)
            .chunk_chars(10, 400)
            .build();

        assert_eq!(config.store_dir, PathBuf::from("/custom/store"));
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.max_context_length, 500);
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.model_mismatch, ModelMismatchPolicy::Warn);
        assert_eq!((config.min_chunk_chars, config.max_chunk_chars), (10, 400));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            RagConfig::from_json(r#"{"default_top_k": 8, "model_mismatch": "warn"}"#).unwrap();
        assert_eq!(config.default_top_k, 8);
        assert_eq!(config.model_mismatch, ModelMismatchPolicy::Warn);
        assert_eq!(config.max_context_length, 3000);
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = RagConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn overrides_replace_non_empty_values() {
        let config = RagConfig::default().with_overrides_from(|key| match key {
            STORE_DIR_ENV => Some("/tmp/shelf".to_string()),
            EMBEDDING_MODEL_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.store_dir, PathBuf::from("/tmp/shelf"));
        assert_eq!(config.embedding_model, "all-minilm:latest");
    }

    #[test]
    fn dimension_override_must_be_positive_integer() {
        let dimension = |raw: &'static str| {
            RagConfig::default()
                .with_overrides_from(|key| {
                    (key == EMBEDDING_DIMENSION_ENV).then(|| raw.to_string())
                })
                .embedding_dimension
        };
        assert_eq!(dimension(" 768 "), 768);
        assert_eq!(dimension("0"), 384);
        assert_eq!(dimension("wide"), 384);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let config = RagConfig::builder().default_top_k(0).build();
        assert!(matches!(config.validate(), Err(RagError::Config(_))));
    }
}
