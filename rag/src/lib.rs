//! Retrieval engine for library-support question answering.
//!
//! [`LibraryRag`] glues any [`EmbeddingModel`](shelf_core::EmbeddingModel) to an exact,
//! parallel vector index persisted on disk, exposing a small API surface:
//! - [`LibraryRag::load`] – install the persisted store, refusing incompatible ones.
//! - [`LibraryRag::ingest_directory`] / [`LibraryRag::rebuild`] – chunk, embed and swap in a
//!   fresh store.
//! - [`LibraryRag::search`] – expand the query, search every variant, boost structured content
//!   and collapse near-duplicates.
//! - [`LibraryRag::format_context`] – turn ranked results into a bounded context block.
//! - [`LibraryRag::get_stats`] – summarise the store for dashboards.
//!
//! The lower-level pieces ([`VectorStore`], [`Retriever`], [`ContextAssembler`],
//! [`QueryExpander`], [`HeuristicBooster`]) are public for callers that want to assemble their
//! own pipeline.

pub mod chunking;
pub mod config;
pub mod context;
pub mod dedup;
pub mod embedder;
pub mod error;
pub mod expansion;
pub mod index;
pub mod ingest;
pub mod persistence;
pub mod rag;
pub mod retriever;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod types;

pub use chunking::{Chunker, SectionChunker};
pub use config::{ModelMismatchPolicy, RagConfig, RagConfigBuilder};
pub use context::ContextAssembler;
pub use embedder::HashEmbedding;
pub use error::{RagError, Result};
pub use expansion::QueryExpander;
pub use index::{FlatIndex, Neighbor, VectorIndex};
pub use ingest::IngestReport;
pub use persistence::{DirectoryPersistence, Persistence};
pub use rag::LibraryRag;
pub use retriever::{Readiness, RetrievalSettings, Retriever};
pub use scoring::{HeuristicBooster, NoBoost, ScoreBooster};
pub use stats::StoreStats;
pub use store::{RebuildGuard, StoreExpectation, StoreSnapshot, VectorStore};
pub use types::{Chunk, Document, KeywordMatch, Metadata, SearchResult};
