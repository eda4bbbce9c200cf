//! Core types for the RAG crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value metadata attached to chunks (source document, page, section, ...).
pub type Metadata = BTreeMap<String, String>;

/// Metadata key holding the source document name.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 1-based page number.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the section heading the chunk was found under.
pub const SECTION_KEY: &str = "section";
/// Metadata key holding the coarse topic of the chunk.
pub const CONTENT_TYPE_KEY: &str = "content_type";

/// A unit of extracted text, typically one PDF page or one plain-text file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for the document (file name plus page).
    pub id: String,
    /// Raw text content.
    pub text: String,
    /// Arbitrary metadata inherited by every chunk cut from this document.
    pub metadata: Metadata,
}

impl Document {
    /// Creates a new document with empty metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Creates a new document with metadata.
    #[must_use]
    pub fn with_metadata(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// A chunk of text ready to be embedded, with its metadata record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of the chunk.
    pub text: String,
    /// Metadata record stored 1:1 with the chunk.
    pub metadata: Metadata,
}

impl Chunk {
    /// Creates a new chunk.
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// A ranked hit produced by the retriever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching chunk text.
    pub content: String,
    /// Squared L2 distance between the query variant and the chunk vector.
    pub distance: f32,
    /// Normalised similarity, `1 / (1 + distance)`.
    pub similarity: f32,
    /// Final score after heuristic boosting.
    pub score: f32,
    /// Metadata record of the chunk.
    pub metadata: Metadata,
    /// The query variant whose embedding produced this hit.
    pub query_variant: String,
    /// Position of the chunk in the store.
    pub chunk_index: usize,
}

impl SearchResult {
    /// Returns the source document name, if recorded.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A chunk matched by plain keyword search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMatch {
    /// Chunk text.
    pub content: String,
    /// Keyword score: three points per occurrence in the text, two more if the source matches.
    pub score: usize,
    /// Metadata record of the chunk.
    pub metadata: Metadata,
    /// Position of the chunk in the store.
    pub chunk_index: usize,
}
