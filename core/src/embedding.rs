//! # Embedding Module
//!
//! Embeddings are dense vector representations of text. Similar passages produce vectors that
//! sit close to each other, which is what the retrieval engine relies on to find the chunks of
//! a library document that answer a question.
//!
//! Every vector stored in one index must come from the same model and therefore share one
//! dimension (384 for `all-minilm`, 768 for `nomic-embed-text`, 1024 for `mxbai-embed-large`).
//! The [`EmbeddingModel::model_id`] is persisted next to the index so a store built with one
//! model is never silently queried with another.
//!
//! ```rust
//! use shelf_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> shelf_core::Result<()> {
//!     let embedding = model.embed("Where can I find past exam papers?").await?;
//!     assert_eq!(embedding.len(), model.dim());
//!     Ok(())
//! }
//! ```

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::future::Future;

/// A type alias for an embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// This is the only contract the retrieval engine consumes from an embedding provider:
/// [`embed`](EmbeddingModel::embed) for queries and
/// [`embed_documents`](EmbeddingModel::embed_documents) for ingestion batches.
///
/// # Implementation Requirements
///
/// - Returned vectors must have length equal to [`dim`](EmbeddingModel::dim)
/// - [`model_id`](EmbeddingModel::model_id) must identify the vector space, two models with the
///   same identifier must produce comparable vectors
/// - Transport failures should surface as errors, never as empty vectors
///
/// # Example
///
/// ```rust
/// use shelf_core::EmbeddingModel;
///
/// struct Constant;
///
/// impl EmbeddingModel for Constant {
///     fn dim(&self) -> usize {
///         3
///     }
///
///     fn model_id(&self) -> &str {
///         "constant"
///     }
///
///     async fn embed(&self, _text: &str) -> shelf_core::Result<Vec<f32>> {
///         Ok(vec![1.0, 0.0, 0.0])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let vectors = Constant
///     .embed_documents(&["a".to_string(), "b".to_string()])
///     .await
///     .unwrap();
/// assert_eq!(vectors.len(), 2);
/// # });
/// ```
pub trait EmbeddingModel: Send + Sized + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Identifier of the model producing the vectors (for example `all-minilm:latest`).
    fn model_id(&self) -> &str;

    /// Converts a single text, typically a user query, to an embedding vector.
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;

    /// Converts a batch of document texts to embedding vectors, in input order.
    ///
    /// The default implementation embeds each text sequentially. Providers with a native batch
    /// endpoint should override it.
    fn embed_documents(
        &self,
        texts: &[String],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }
}

impl<M: EmbeddingModel> EmbeddingModel for Arc<M> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send {
        (**self).embed(text)
    }

    fn embed_documents(
        &self,
        texts: &[String],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        (**self).embed_documents(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct MockEmbeddingModel {
        dimension: usize,
        calls: AtomicUsize,
    }

    impl EmbeddingModel for MockEmbeddingModel {
        fn dim(&self) -> usize {
            self.dimension
        }

        fn model_id(&self) -> &str {
            "mock"
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut embedding = vec![0.0; self.dimension];
            for (i, value) in embedding.iter_mut().enumerate() {
                *value = (text.len() + i) as f32 * 0.01;
            }
            Ok(embedding)
        }
    }

    struct FailingModel;

    impl EmbeddingModel for FailingModel {
        fn dim(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "failing"
        }

        async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
            if text == "bad" {
                anyhow::bail!("provider rejected input");
            }
            Ok(vec![1.0, 1.0])
        }
    }

    #[tokio::test]
    async fn embedding_generation() {
        let model = MockEmbeddingModel {
            dimension: 4,
            calls: AtomicUsize::new(0),
        };
        let embedding = model.embed("test").await.unwrap();

        assert_eq!(embedding.len(), 4);
        assert!((embedding[0] - 0.04).abs() < f32::EPSILON);
        assert!((embedding[3] - 0.07).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn batch_embeds_in_order() {
        let model = MockEmbeddingModel {
            dimension: 2,
            calls: AtomicUsize::new(0),
        };
        let texts = vec!["a".to_string(), "abc".to_string()];
        let vectors = model.embed_documents(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert!((vectors[0][0] - 0.01).abs() < f32::EPSILON);
        assert!((vectors[1][0] - 0.03).abs() < f32::EPSILON);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_fails_when_any_item_fails() {
        let texts = vec!["good".to_string(), "bad".to_string()];
        assert!(FailingModel.embed_documents(&texts).await.is_err());
    }

    #[tokio::test]
    async fn arc_delegates_to_inner_model() {
        let model = Arc::new(MockEmbeddingModel {
            dimension: 3,
            calls: AtomicUsize::new(0),
        });
        assert_eq!(model.dim(), 3);
        assert_eq!(model.model_id(), "mock");
        model.embed("x").await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
