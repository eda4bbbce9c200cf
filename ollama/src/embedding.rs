use serde::{Deserialize, Serialize};
use shelf_core::{Embedding, EmbeddingModel, Result as CoreResult};
use std::sync::Arc;
use tracing::debug;

use crate::{config::OllamaConfig, error::OllamaError};

/// An [`EmbeddingModel`] served by Ollama's `/api/embeddings` endpoint.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    config: Arc<OllamaConfig>,
    http: reqwest::Client,
}

impl OllamaEmbedding {
    /// Creates an adapter for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`OllamaError::Http`] if the HTTP client cannot be initialised.
    pub fn new(config: OllamaConfig) -> Result<Self, OllamaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent("shelf-ollama/0.1")
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn embed_once(&self, prompt: &str) -> Result<Embedding, OllamaError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            prompt,
        };
        let response = self
            .http
            .post(self.config.endpoint("/api/embeddings"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let EmbeddingResponse { embedding } = response.json().await?;
        if embedding.len() != self.config.dimension {
            return Err(OllamaError::Dimension {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }
        debug!(model = %self.config.model, chars = prompt.len(), "embedded text");
        Ok(embedding)
    }
}

impl EmbeddingModel for OllamaEmbedding {
    fn dim(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn embed(
        &self,
        text: &str,
    ) -> impl core::future::Future<Output = CoreResult<Embedding>> + Send {
        let this = self.clone();
        let prompt = text.to_owned();
        async move { Ok(this.embed_once(&prompt).await?) }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}
