//! Store introspection for dashboards.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dedup::char_prefix;
use crate::store::StoreSnapshot;
use crate::types::{CONTENT_TYPE_KEY, SOURCE_KEY};

/// Number of chunks shown in [`StoreStats::Loaded::sample_chunks`].
pub const SAMPLE_CHUNKS: usize = 3;

/// Store statistics, serialized with a `status` tag (`loaded` or `not_loaded`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreStats {
    /// The store is loaded.
    Loaded {
        /// Number of chunks.
        total_chunks: usize,
        /// Number of indexed vectors.
        index_size: usize,
        /// Embedding model the store was built with.
        embedding_model: String,
        /// Vector dimension.
        dimension: usize,
        /// Chunks mentioning each expansion keyword.
        keyword_counts: BTreeMap<String, usize>,
        /// Leading excerpts of the first chunks.
        sample_chunks: Vec<String>,
        /// Chunks per source document.
        sources: BTreeMap<String, usize>,
        /// Chunks per content type.
        content_types: BTreeMap<String, usize>,
        /// Vectors that are all zeros (embedding failed at ingestion).
        zero_vectors: usize,
    },
    /// No store is loaded.
    NotLoaded,
}

impl StoreStats {
    /// Summarises `snapshot`, or reports `not_loaded` for `None`.
    #[must_use]
    pub fn collect(
        snapshot: Option<&StoreSnapshot>,
        keywords: &[String],
        sample_chars: usize,
    ) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::NotLoaded;
        };

        let lowered: Vec<String> = snapshot.chunks().iter().map(|c| c.to_lowercase()).collect();
        let keyword_counts = keywords
            .iter()
            .map(|keyword| {
                let hits = lowered
                    .iter()
                    .filter(|chunk| chunk.contains(keyword.as_str()))
                    .count();
                (keyword.clone(), hits)
            })
            .collect();

        let mut sources = BTreeMap::new();
        let mut content_types = BTreeMap::new();
        for metadata in snapshot.metadata_records() {
            let source = metadata.get(SOURCE_KEY).map_or("unknown", String::as_str);
            *sources.entry(source.to_string()).or_insert(0) += 1;
            let kind = metadata.get(CONTENT_TYPE_KEY).map_or("general", String::as_str);
            *content_types.entry(kind.to_string()).or_insert(0) += 1;
        }

        Self::Loaded {
            total_chunks: snapshot.len(),
            index_size: crate::index::VectorIndex::len(snapshot.index()),
            embedding_model: snapshot.embedding_model().to_string(),
            dimension: snapshot.dimension(),
            keyword_counts,
            sample_chunks: snapshot
                .chunks()
                .iter()
                .take(SAMPLE_CHUNKS)
                .map(|chunk| char_prefix(chunk, sample_chars).to_string())
                .collect(),
            sources,
            content_types,
            zero_vectors: snapshot.index().zero_vectors(),
        }
    }

    /// Returns `true` for the loaded variant.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}
