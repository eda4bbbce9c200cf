//! Query expansion, vector search, boosting, deduplication and ranking.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use shelf_core::EmbeddingModel;

use crate::config::RagConfig;
use crate::dedup::collapse_duplicates;
use crate::error::{RagError, Result};
use crate::expansion::QueryExpander;
use crate::index::{Neighbor, VectorIndex, distance_to_score};
use crate::persistence::{DirectoryPersistence, Persistence};
use crate::scoring::{HeuristicBooster, ScoreBooster};
use crate::store::{StoreSnapshot, VectorStore};
use crate::types::{KeywordMatch, SOURCE_KEY, SearchResult};

/// Whether the retriever can answer searches, and if not, why.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Store loaded and embedder configured.
    Ready,
    /// No embedder is configured.
    EmbedderUnavailable,
    /// The store is not loaded.
    StoreNotLoaded,
}

/// Tuning for [`Retriever::search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// `k` used when a search does not give one.
    pub default_top_k: usize,
    /// Neighbours fetched per variant, as a multiple of `k`.
    pub over_fetch_factor: usize,
    /// Prefix length, in characters, of the duplicate fingerprint.
    pub fingerprint_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for RetrievalSettings {
    fn from(config: &RagConfig) -> Self {
        Self {
            default_top_k: config.default_top_k,
            over_fetch_factor: config.over_fetch_factor,
            fingerprint_chars: config.fingerprint_chars,
        }
    }
}

/// Searches a [`VectorStore`] for chunks answering a question.
///
/// The pipeline for one query:
///
/// 1. expand the query into variants with the [`QueryExpander`]
/// 2. embed each variant and fetch `min(over_fetch_factor * k, store size)` neighbours
/// 3. score each hit as `1 / (1 + distance) * (1 + boost)`
/// 4. collapse hits whose first characters match, keeping the best score
/// 5. sort by score, descending and stable, and keep `k`
pub struct Retriever<M, B = HeuristicBooster, P: Persistence = DirectoryPersistence> {
    store: Arc<VectorStore<P>>,
    embedder: Option<Arc<M>>,
    expander: QueryExpander,
    booster: B,
    settings: RetrievalSettings,
}

impl<M, B, P: Persistence> std::fmt::Debug for Retriever<M, B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("store", &self.store)
            .field("embedder", &self.embedder.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel, P: Persistence> Retriever<M, HeuristicBooster, P> {
    /// Creates a retriever with the library expansion table and heuristic booster.
    #[must_use]
    pub fn new(store: Arc<VectorStore<P>>, embedder: Option<Arc<M>>) -> Self {
        Self {
            store,
            embedder,
            expander: QueryExpander::default(),
            booster: HeuristicBooster::default(),
            settings: RetrievalSettings::default(),
        }
    }
}

impl<M: EmbeddingModel, B: ScoreBooster, P: Persistence> Retriever<M, B, P> {
    /// Replaces the score booster.
    #[must_use]
    pub fn with_booster<B2: ScoreBooster>(self, booster: B2) -> Retriever<M, B2, P> {
        Retriever {
            store: self.store,
            embedder: self.embedder,
            expander: self.expander,
            booster,
            settings: self.settings,
        }
    }

    /// Replaces the query expander.
    #[must_use]
    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Replaces the retrieval settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the query expander.
    pub const fn expander(&self) -> &QueryExpander {
        &self.expander
    }

    /// Returns the store searched by this retriever.
    pub const fn store(&self) -> &Arc<VectorStore<P>> {
        &self.store
    }

    /// Returns the embedder, if one is configured.
    pub fn embedder(&self) -> Option<&Arc<M>> {
        self.embedder.as_ref()
    }

    /// Reports whether searches can return results.
    pub fn readiness(&self) -> Readiness {
        if self.embedder.is_none() {
            Readiness::EmbedderUnavailable
        } else if !self.store.is_loaded() {
            Readiness::StoreNotLoaded
        } else {
            Readiness::Ready
        }
    }

    /// Returns at most `k` results sorted by descending score.
    ///
    /// `None` uses the configured default. An engine that is not ready, or whose embedder fails
    /// for every variant, yields an empty list; check [`readiness`](Self::readiness) to tell
    /// that apart from "no matches".
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`] if `k` is zero.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchResult>> {
        let k = top_k.unwrap_or(self.settings.default_top_k);
        if k == 0 {
            return Err(RagError::InvalidTopK(k));
        }

        let Some(embedder) = self.embedder.as_deref() else {
            warn!("search requested but no embedder is configured");
            return Ok(Vec::new());
        };
        let Some(snapshot) = self.store.snapshot() else {
            warn!("search requested but the vector store is not loaded");
            return Ok(Vec::new());
        };

        let fetch = k
            .saturating_mul(self.settings.over_fetch_factor)
            .min(snapshot.len());
        if fetch == 0 {
            return Ok(Vec::new());
        }

        let variants = self.expander.expand(query);
        debug!(query, variants = variants.len(), fetch, "searching vector store");

        let mut hits = Vec::with_capacity(variants.len() * fetch);
        for variant in &variants {
            let vector = match embedder.embed(variant).await {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(variant = variant.as_str(), error = %e, "failed to embed query variant");
                    continue;
                }
            };
            let neighbors = match snapshot.index().search(&vector, fetch) {
                Ok(neighbors) => neighbors,
                Err(e) => {
                    warn!(variant = variant.as_str(), error = %e, "index search failed");
                    continue;
                }
            };
            hits.extend(
                neighbors
                    .into_iter()
                    .filter_map(|neighbor| self.score(&snapshot, neighbor, query, variant)),
            );
        }

        let mut results = collapse_duplicates(hits, self.settings.fingerprint_chars);
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        debug!(query, results = results.len(), "search finished");
        Ok(results)
    }

    fn score(
        &self,
        snapshot: &StoreSnapshot,
        neighbor: Neighbor,
        query: &str,
        variant: &str,
    ) -> Option<SearchResult> {
        let (Some(content), Some(metadata)) = (
            snapshot.chunk(neighbor.index),
            snapshot.metadata(neighbor.index),
        ) else {
            debug!(index = neighbor.index, "skipping out-of-range neighbour");
            return None;
        };

        let similarity = distance_to_score(neighbor.distance);
        if similarity.is_nan() || similarity <= 0.0 {
            return None;
        }
        let boost = self.booster.boost(content, query);

        Some(SearchResult {
            content: content.to_string(),
            distance: neighbor.distance,
            similarity,
            score: similarity * (1.0 + boost),
            metadata: metadata.clone(),
            query_variant: variant.to_string(),
            chunk_index: neighbor.index,
        })
    }

    /// Plain keyword search over the loaded chunks.
    ///
    /// A chunk scores three points per case-insensitive occurrence of `keyword` in its text,
    /// plus two if its source name contains the keyword. Chunks scoring zero are dropped; an
    /// unloaded store or empty keyword yields nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`] if `k` is zero.
    pub fn keyword_search(&self, keyword: &str, k: usize) -> Result<Vec<KeywordMatch>> {
        if k == 0 {
            return Err(RagError::InvalidTopK(k));
        }
        let needle = keyword.trim().to_lowercase();
        let Some(snapshot) = self.store.snapshot() else {
            return Ok(Vec::new());
        };
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<KeywordMatch> = snapshot
            .chunks()
            .iter()
            .zip(snapshot.metadata_records())
            .enumerate()
            .filter_map(|(chunk_index, (content, metadata))| {
                let in_text = content.to_lowercase().matches(needle.as_str()).count() * 3;
                let in_source = metadata
                    .get(SOURCE_KEY)
                    .is_some_and(|source| source.to_lowercase().contains(needle.as_str()));
                let score = in_text + if in_source { 2 } else { 0 };
                (score > 0).then(|| KeywordMatch {
                    content: content.clone(),
                    score,
                    metadata: metadata.clone(),
                    chunk_index,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FlatIndex;
    use crate::scoring::NoBoost;
    use crate::types::Metadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    /// Embeds text as counts of a few topic words.
    struct TopicEmbedder {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    const TOPICS: [&str; 3] = ["renew", "hours", "exam"];

    impl TopicEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }

        #[allow(clippy::cast_precision_loss)]
        fn vector(text: &str) -> Vec<f32> {
            let lowered = text.to_lowercase();
            TOPICS
                .iter()
                .map(|topic| lowered.matches(topic).count() as f32)
                .collect()
        }
    }

    impl EmbeddingModel for TopicEmbedder {
        fn dim(&self) -> usize {
            TOPICS.len()
        }

        fn model_id(&self) -> &str {
            "topics"
        }

        async fn embed(&self, text: &str) -> shelf_core::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.is_some_and(|bad| text == bad) {
                anyhow::bail!("embedding service unavailable");
            }
            Ok(Self::vector(text))
        }
    }

    async fn store_with(chunks: &[&str]) -> (TempDir, Arc<VectorStore>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(VectorStore::open(dir.path()));
        let index = FlatIndex::build(
            TOPICS.len(),
            chunks.iter().map(|chunk| TopicEmbedder::vector(chunk)),
        )
        .unwrap();
        let snapshot = StoreSnapshot::new(
            chunks.iter().map(ToString::to_string).collect(),
            chunks
                .iter()
                .enumerate()
                .map(|(i, _)| Metadata::from([(SOURCE_KEY.to_string(), format!("doc{i}.pdf"))]))
                .collect(),
            index,
            "topics",
        )
        .unwrap();
        store.begin_rebuild().await.commit(snapshot).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn zero_k_is_rejected_even_when_not_ready() {
        let store = Arc::new(VectorStore::open("/nonexistent/shelf"));
        let retriever: Retriever<TopicEmbedder> = Retriever::new(store, None);
        assert!(matches!(
            retriever.search("hours", Some(0)).await,
            Err(RagError::InvalidTopK(0))
        ));
    }

    #[tokio::test]
    async fn missing_embedder_degrades_to_empty() {
        let (_dir, store) = store_with(&["Library hours are 8 to 5"]).await;
        let retriever: Retriever<TopicEmbedder> = Retriever::new(store, None);
        assert_eq!(retriever.readiness(), Readiness::EmbedderUnavailable);
        assert!(retriever.search("hours", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unloaded_store_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let store = Arc::new(VectorStore::open(dir.path()));
        let embedder = Arc::new(TopicEmbedder::new());
        let retriever = Retriever::new(store, Some(Arc::clone(&embedder)));
        assert_eq!(retriever.readiness(), Readiness::StoreNotLoaded);
        assert!(retriever.search("hours", None).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ranks_closest_chunk_first_and_respects_k() {
        let (_dir, store) = store_with(&[
            "Exam papers are archived online",
            "Opening hours: the library hours change in summer",
            "Renew loans at the desk",
        ])
        .await;
        let retriever = Retriever::new(store, Some(Arc::new(TopicEmbedder::new())));
        assert_eq!(retriever.readiness(), Readiness::Ready);

        let results = retriever.search("hours hours", Some(2)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_index, 1);
        assert!(results[0].distance.abs() < f32::EPSILON);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| r.score > 0.0));
        assert_eq!(results[0].source(), Some("doc1.pdf"));
    }

    #[tokio::test]
    async fn embeds_every_variant() {
        let (_dir, store) = store_with(&["Renew loans at the desk"]).await;
        let embedder = Arc::new(TopicEmbedder::new());
        let retriever = Retriever::new(store, Some(Arc::clone(&embedder)));
        let variants = retriever.expander().expand("renew");

        let results = retriever.search("renew", Some(3)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), variants.len());
    }

    #[tokio::test]
    async fn failing_variant_is_skipped() {
        let (_dir, store) = store_with(&["Renew loans at the desk"]).await;
        let embedder = Arc::new(TopicEmbedder {
            calls: AtomicUsize::new(0),
            fail_on: Some("renew"),
        });
        let retriever = Retriever::new(store, Some(embedder));

        let results = retriever.search("renew", Some(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_ne!(results[0].query_variant, "renew");
    }

    #[tokio::test]
    async fn duplicate_prefixes_collapse() {
        let shared = "Exam timetable ".repeat(20);
        let first = format!("{shared} first copy");
        let second = format!("{shared} second copy");
        let (_dir, store) = store_with(&[first.as_str(), second.as_str(), "Library hours"]).await;
        let retriever =
            Retriever::new(store, Some(Arc::new(TopicEmbedder::new()))).with_booster(NoBoost);

        let results = retriever.search("exam", Some(3)).await.unwrap();
        let copies = results
            .iter()
            .filter(|r| r.content.starts_with("Exam timetable"))
            .count();
        assert_eq!(copies, 1);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn verbatim_match_outranks_identical_vector() {
        let (_dir, store) =
            store_with(&["Closing soon, check hours", "Check the library hours online"]).await;
        let retriever = Retriever::new(store, Some(Arc::new(TopicEmbedder::new())));

        let results = retriever.search("library hours", Some(2)).await.unwrap();
        assert_eq!(results[0].chunk_index, 1);
        assert!(results[0].score > results[1].score);
        assert!((results[0].similarity - results[1].similarity).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn keyword_search_scores_text_and_source() {
        let (_dir, store) = store_with(&[
            "fines fines fines",
            "One fine per day",
            "Nothing relevant",
        ])
        .await;
        let retriever: Retriever<TopicEmbedder> = Retriever::new(store, None);

        let matches = retriever.keyword_search("FINE", 5).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].chunk_index, 0);
        assert_eq!(matches[0].score, 9);
        assert_eq!(matches[1].score, 3);

        let by_source = retriever.keyword_search("doc2", 5).unwrap();
        assert_eq!(by_source.len(), 1);
        assert_eq!(by_source[0].score, 2);
        assert!(retriever.keyword_search("  ", 5).unwrap().is_empty());
        assert!(retriever.keyword_search("fine", 0).is_err());
    }
}
