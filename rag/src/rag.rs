//! The library-support RAG engine: one object wiring store, retriever, assembler and ingestion.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use shelf_core::EmbeddingModel;

use crate::chunking::{Chunker, SectionChunker};
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::error::{RagError, Result};
use crate::expansion::QueryExpander;
use crate::index::FlatIndex;
use crate::ingest::{IngestReport, chunk_sources, collect_sources, embed_with_fallback};
use crate::persistence::DirectoryPersistence;
use crate::retriever::{Readiness, RetrievalSettings, Retriever};
use crate::scoring::{HeuristicBooster, ScoreBooster};
use crate::stats::StoreStats;
use crate::store::{StoreExpectation, StoreSnapshot, VectorStore};
use crate::types::{Chunk, KeywordMatch, SearchResult};

/// Characters kept per sample chunk in [`LibraryRag::get_stats`].
const STATS_SAMPLE_CHARS: usize = 200;

/// Retrieval-augmented context for library-support questions.
///
/// `LibraryRag` owns a persisted [`VectorStore`], a [`Retriever`] that searches it and a
/// [`ContextAssembler`] that turns results into a bounded prompt block. Build it once and share
/// it across requests; searches only read the current snapshot, while
/// [`rebuild`](Self::rebuild) prepares a new one and swaps it in atomically.
///
/// # Example
///
/// ```rust,no_run
/// use shelf_rag::{HashEmbedding, LibraryRag, RagConfig};
///
/// # async fn demo() -> shelf_rag::Result<()> {
/// let rag = LibraryRag::new(HashEmbedding::default(), RagConfig::default());
/// if !rag.load() {
///     rag.ingest_directory("./uploads".as_ref()).await?;
/// }
/// let context = rag.answer_context("how do I renew a book?").await;
/// println!("{context}");
/// # Ok(())
/// # }
/// ```
pub struct LibraryRag<M, B = HeuristicBooster> {
    config: RagConfig,
    retriever: Retriever<M, B>,
    assembler: ContextAssembler,
    chunker: SectionChunker,
}

impl<M, B> std::fmt::Debug for LibraryRag<M, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryRag")
            .field("config", &self.config)
            .field("retriever", &self.retriever)
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel> LibraryRag<M> {
    /// Creates an unloaded engine that embeds with `embedder`.
    #[must_use]
    pub fn new(embedder: M, config: RagConfig) -> Self {
        Self::assemble(Some(Arc::new(embedder)), config)
    }

    /// Creates an engine with no embedder.
    ///
    /// Stats, keyword search and context formatting work; [`search`](Self::search) returns no
    /// results and [`rebuild`](Self::rebuild) fails with [`RagError::EmbedderUnavailable`].
    #[must_use]
    pub fn without_embedder(config: RagConfig) -> Self {
        Self::assemble(None, config)
    }

    fn assemble(embedder: Option<Arc<M>>, config: RagConfig) -> Self {
        let persistence = DirectoryPersistence::new(config.store_dir.clone())
            .with_excerpt(config.debug_dump_chunks, config.debug_excerpt_chars);
        let store = Arc::new(VectorStore::new(persistence));
        let retriever =
            Retriever::new(store, embedder).with_settings(RetrievalSettings::from(&config));
        Self {
            assembler: ContextAssembler::new(config.max_context_length),
            chunker: SectionChunker::new(config.min_chunk_chars, config.max_chunk_chars),
            retriever,
            config,
        }
    }
}

impl<M: EmbeddingModel, B: ScoreBooster> LibraryRag<M, B> {
    /// Replaces the score booster.
    #[must_use]
    pub fn with_booster<B2: ScoreBooster>(self, booster: B2) -> LibraryRag<M, B2> {
        LibraryRag {
            config: self.config,
            retriever: self.retriever.with_booster(booster),
            assembler: self.assembler,
            chunker: self.chunker,
        }
    }

    /// Replaces the query expander.
    #[must_use]
    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.retriever = self.retriever.with_expander(expander);
        self
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<VectorStore> {
        self.retriever.store()
    }

    /// Returns the retriever.
    pub const fn retriever(&self) -> &Retriever<M, B> {
        &self.retriever
    }

    /// Reports whether searches can return results.
    pub fn readiness(&self) -> Readiness {
        self.retriever.readiness()
    }

    /// Loads the persisted store and returns whether it is now loaded.
    ///
    /// Never fails: a missing, corrupt or incompatible store leaves the engine unloaded.
    pub fn load(&self) -> bool {
        let expect = self.retriever.embedder().map_or(
            StoreExpectation {
                embedding_model: &self.config.embedding_model,
                dimension: None,
                policy: self.config.model_mismatch,
            },
            |embedder| StoreExpectation {
                embedding_model: embedder.model_id(),
                dimension: Some(embedder.dim()),
                policy: self.config.model_mismatch,
            },
        );
        self.store().load(&expect)
    }

    /// Replaces the whole store with `chunks`.
    ///
    /// Chunks are embedded in batches; a chunk whose embedding fails is stored with a zero
    /// vector, unless every chunk fails. The new store is persisted and then swapped in;
    /// searches running meanwhile keep using the previous store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbedderUnavailable`] without an embedder,
    /// [`RagError::EmbeddingFailed`] if no chunk could be embedded, or the persistence error if
    /// the store cannot be written. The previous store stays installed and on disk on error.
    pub async fn rebuild(&self, chunks: Vec<Chunk>) -> Result<IngestReport> {
        let embedder = self
            .retriever
            .embedder()
            .ok_or(RagError::EmbedderUnavailable)?;
        let guard = self.store().begin_rebuild().await;
        info!(chunks = chunks.len(), "rebuilding vector store");

        let (texts, metadata): (Vec<String>, Vec<_>) = chunks
            .into_iter()
            .map(|chunk| (chunk.text, chunk.metadata))
            .unzip();
        let (vectors, zero_vectors) =
            embed_with_fallback(embedder.as_ref(), &texts, self.config.embed_batch_size).await;
        if !texts.is_empty() && zero_vectors == texts.len() {
            error!(chunks = texts.len(), "every embedding failed, rebuild aborted");
            return Err(RagError::EmbeddingFailed {
                chunks: texts.len(),
            });
        }
        let index = FlatIndex::build(embedder.dim(), vectors)?;
        let snapshot = StoreSnapshot::new(texts, metadata, index, embedder.model_id())?;
        let snapshot = guard.commit(snapshot)?;

        Ok(IngestReport {
            chunks: snapshot.len(),
            zero_vectors,
            ..IngestReport::default()
        })
    }

    /// Chunks every supported file directly inside `dir` and rebuilds the store from them.
    ///
    /// Unreadable files are skipped and listed in the report.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyCorpus`] if no file yields a chunk, and any error of
    /// [`rebuild`](Self::rebuild).
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let sources = collect_sources(dir)?;
        let mut report = IngestReport::default();
        let chunks = chunk_sources(&self.chunker, &sources, &mut report);
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus(dir.to_path_buf()));
        }
        info!(
            dir = %dir.display(),
            files = report.files,
            chunker = self.chunker.name(),
            chunks = chunks.len(),
            "chunked corpus"
        );

        let built = self.rebuild(chunks).await?;
        report.chunks = built.chunks;
        report.zero_vectors = built.zero_vectors;
        Ok(report)
    }

    /// Searches the store; see [`Retriever::search`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`] if `k` is zero.
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<SearchResult>> {
        self.retriever.search(query, k).await
    }

    /// Ranks chunks by literal keyword occurrences; see [`Retriever::keyword_search`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`] if `k` is zero.
    pub fn keyword_search(&self, keyword: &str, k: usize) -> Result<Vec<KeywordMatch>> {
        self.retriever.keyword_search(keyword, k)
    }

    /// Formats results into a bounded context block; see [`ContextAssembler::format`].
    #[must_use]
    pub fn format_context(&self, results: &[SearchResult], max_length: Option<usize>) -> String {
        self.assembler.format(results, max_length)
    }

    /// Searches for `message` and formats the results, the context handed to generation.
    ///
    /// An empty message, or a failed search, yields an empty context.
    pub async fn answer_context(&self, message: &str) -> String {
        if message.trim().is_empty() {
            return String::new();
        }
        match self.search(message, None).await {
            Ok(results) => self.format_context(&results, None),
            Err(e) => {
                warn!(error = %e, "search failed, answering without context");
                String::new()
            }
        }
    }

    /// Summarises the store. Never fails.
    pub fn get_stats(&self) -> StoreStats {
        StoreStats::collect(
            self.store().snapshot().as_deref(),
            self.retriever.expander().keywords(),
            STATS_SAMPLE_CHARS,
        )
    }

    /// Unloads the store and removes its persisted files.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if files cannot be removed; the store is unloaded regardless.
    pub async fn clear(&self) -> Result<()> {
        self.store().clear().await
    }
}
