use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{DEFAULT_BASE_URL, DEFAULT_DIMENSION, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Environment variable overriding [`OllamaConfig::base_url`].
pub const BASE_URL_ENV: &str = "OLLAMA_BASE_URL";
/// Environment variable overriding [`OllamaConfig::model`].
pub const MODEL_ENV: &str = "EMBEDDING_MODEL";

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Server root, without the `/api` suffix.
    pub base_url: String,
    /// Embedding model name, e.g. `all-minilm:latest`.
    pub model: String,
    /// Vector dimension the model produces.
    pub dimension: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OllamaConfig {
    /// Sets the server root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model and the dimension it produces.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Applies [`BASE_URL_ENV`] and [`MODEL_ENV`] from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key| lookup(key).filter(|value: &String| !value.trim().is_empty());
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            self.model = model;
        }
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub(crate) const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
