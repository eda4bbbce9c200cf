//! Text chunking for ingestion.
//!
//! This module provides the [`Chunker`] trait and the [`SectionChunker`] used for library
//! handbooks: it follows section headings across pages and cuts each section into short
//! paragraphs tagged with a coarse topic.

mod section;

pub use section::SectionChunker;

use crate::types::{Chunk, Document};

/// Trait for text chunking strategies.
pub trait Chunker: Send + Sync {
    /// Splits the pages of one source document into chunks, in reading order.
    fn chunk(&self, pages: &[Document]) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy.
    fn name(&self) -> &'static str;
}

/// Topic keywords checked in order; the first group with a hit names the content type.
const CONTENT_TYPES: &[(&str, &[&str])] = &[
    ("fines", &["fine", "overdue", "penalty", "charge"]),
    ("borrowing", &["borrow", "loan", "renew", "return"]),
    ("academic_integrity", &["plagiarism", "turnitin", "citation"]),
    ("hours", &["hour", "open", "close", "schedule"]),
    ("eresources", &["access", "myloft", "e-resource", "database"]),
    ("membership", &["staff", "student", "category", "maximum"]),
    ("referencing", &["apa", "reference", "format"]),
];

/// Classifies text into a coarse library topic, `general` when nothing matches.
#[must_use]
pub fn classify_content(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(_, words)| words.iter().any(|word| lowered.contains(word)))
        .map_or("general", |(kind, _)| kind)
}
