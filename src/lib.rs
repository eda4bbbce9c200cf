#![no_std]
//! # shelf
//!
//! Façade crate for the shelf workspace. It re-exports the embedding abstractions from
//! [`shelf_core`] and, behind features, the retrieval engine, the Ollama embedding adapter and
//! PDF text extraction. Pull this crate into a service to answer library-support questions over
//! a corpus of uploaded documents.
//!
//! ## What's inside?
//!
//! - [`EmbeddingModel`](shelf_core::EmbeddingModel): the provider-neutral embedder interface.
//! - `rag` (default): exact vector index, persisted store, query expansion, heuristic re-ranking
//!   and bounded context assembly.
//! - `ollama`: an [`EmbeddingModel`](shelf_core::EmbeddingModel) backed by a local Ollama server.
//! - `pdf`: page text extraction used by ingestion.
//!
//! ## Example
//!
//! ```rust,no_run
//! use shelf::rag::{HashEmbedding, LibraryRag, RagConfig};
//!
//! async fn demo() -> shelf::rag::Result<String> {
//!     let config = RagConfig::builder().store_dir("./data/vector_store").build();
//!     let rag = LibraryRag::new(HashEmbedding::default(), config);
//!     if !rag.load() {
//!         rag.ingest_directory("./uploads".as_ref()).await?;
//!     }
//!     Ok(rag.answer_context("how do I access past exam papers?").await)
//! }
//! ```

pub use shelf_core::*;

/// Retrieval engine: index, store, expansion, scoring and context assembly.
#[cfg(feature = "rag")]
pub use shelf_rag as rag;

/// Ollama embedding adapter.
#[cfg(feature = "ollama")]
pub use shelf_ollama as ollama;

/// PDF page text extraction.
#[cfg(feature = "pdf")]
pub use shelf_pdf as pdf;
