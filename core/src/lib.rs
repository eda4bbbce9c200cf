//! # shelf-core
//!
//! `shelf-core` hosts the `no_std` trait API that the rest of the workspace builds on: the
//! [`EmbeddingModel`] abstraction that turns text into dense vectors. The retrieval engine in
//! `shelf-rag` only ever talks to this trait, so a provider can be swapped (a local hash
//! embedder for tests, an Ollama server in production) without touching the index, the
//! retriever or the context assembler.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  shelf-rag      │───▶│   shelf-core     │◀───│   Providers     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - retriever     │    │ - EmbeddingModel │    │ - ollama        │
//! │ - ingestion     │    │ - Result         │    │ - hash (local)  │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`embedding`]: turn text into dense vectors.

#![no_std]
extern crate alloc;

/// Text embeddings.
pub mod embedding;

use alloc::string::String;

#[doc(inline)]
pub use embedding::{Embedding, EmbeddingModel};

/// Result type used throughout the crate.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
