//! The vector store: an immutable snapshot behind an atomically swappable handle.
//!
//! Readers take an `Arc` of the current [`StoreSnapshot`] and search it without holding any
//! lock. A rebuild prepares a complete new snapshot under the single-writer [`RebuildGuard`],
//! persists it, then swaps it in; readers see either the old store or the new one, never a mix.

use async_lock::{Mutex, MutexGuard};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ModelMismatchPolicy;
use crate::error::{RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::persistence::{DirectoryPersistence, Persistence};
use crate::types::Metadata;

/// Chunks, metadata records and their vectors, positionally aligned.
///
/// Position `i` of the chunk list, the metadata list and the index always describe the same
/// chunk; the constructor refuses anything else.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreSnapshot {
    chunks: Vec<String>,
    metadata: Vec<Metadata>,
    index: FlatIndex,
    embedding_model: String,
}

impl StoreSnapshot {
    /// Assembles a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LengthMismatch`] unless chunks, metadata and index have equal length.
    pub fn new(
        chunks: Vec<String>,
        metadata: Vec<Metadata>,
        index: FlatIndex,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        if chunks.len() != metadata.len() || chunks.len() != index.len() {
            return Err(RagError::LengthMismatch {
                chunks: chunks.len(),
                metadata: metadata.len(),
                vectors: index.len(),
            });
        }
        Ok(Self {
            chunks,
            metadata,
            index,
            embedding_model: embedding_model.into(),
        })
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the snapshot holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk text at `position`.
    #[must_use]
    pub fn chunk(&self, position: usize) -> Option<&str> {
        self.chunks.get(position).map(String::as_str)
    }

    /// Metadata record at `position`.
    #[must_use]
    pub fn metadata(&self, position: usize) -> Option<&Metadata> {
        self.metadata.get(position)
    }

    /// All chunk texts in position order.
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// All metadata records in position order.
    #[must_use]
    pub fn metadata_records(&self) -> &[Metadata] {
        &self.metadata
    }

    /// The vector index.
    #[must_use]
    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Vector dimension of the index.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Identifier of the embedding model the vectors were produced with.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

/// What a loaded store must agree with before it may serve searches.
#[derive(Clone, Copy, Debug)]
pub struct StoreExpectation<'a> {
    /// Model identifier of the configured embedder.
    pub embedding_model: &'a str,
    /// Vector dimension of the configured embedder, unchecked when `None`.
    pub dimension: Option<usize>,
    /// Reaction to a differing model identifier.
    pub policy: ModelMismatchPolicy,
}

impl StoreExpectation<'_> {
    fn check(&self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Some(expected) = self.dimension {
            if !snapshot.is_empty() && snapshot.dimension() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: snapshot.dimension(),
                });
            }
        }
        if snapshot.embedding_model() != self.embedding_model {
            match self.policy {
                ModelMismatchPolicy::Reject => {
                    return Err(RagError::ModelMismatch {
                        stored: snapshot.embedding_model().to_string(),
                        configured: self.embedding_model.to_string(),
                    });
                }
                ModelMismatchPolicy::Warn => warn!(
                    stored = snapshot.embedding_model(),
                    configured = self.embedding_model,
                    "serving a store built with a different embedding model"
                ),
            }
        }
        Ok(())
    }
}

/// The shared store with an `UNLOADED`/`LOADED` lifecycle.
pub struct VectorStore<P: Persistence = DirectoryPersistence> {
    persistence: P,
    current: RwLock<Option<Arc<StoreSnapshot>>>,
    writer: Mutex<()>,
}

impl<P: Persistence> std::fmt::Debug for VectorStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.persistence.path())
            .field("loaded", &self.is_loaded())
            .field("chunks", &self.snapshot().map_or(0, |s| s.len()))
            .finish_non_exhaustive()
    }
}

impl VectorStore<DirectoryPersistence> {
    /// Opens an unloaded store persisted in `dir`.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(DirectoryPersistence::new(dir))
    }
}

impl<P: Persistence> VectorStore<P> {
    /// Creates an unloaded store over a persistence backend.
    #[must_use]
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            current: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Returns the persistence backend.
    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Loads the persisted store and returns whether the store is now `LOADED`.
    ///
    /// Missing, corrupt or incompatible artifacts leave the store `UNLOADED` and are logged.
    /// While a rebuild holds the writer, the current state is kept and reported.
    pub fn load(&self, expect: &StoreExpectation<'_>) -> bool {
        let Some(_writer) = self.writer.try_lock() else {
            warn!("rebuild in progress, keeping the current vector store");
            return self.is_loaded();
        };

        let path = self.persistence.path().display().to_string();
        let loaded = match self.persistence.load() {
            Ok(Some(snapshot)) => match expect.check(&snapshot) {
                Ok(()) => {
                    info!(
                        path,
                        chunks = snapshot.len(),
                        embedding_model = snapshot.embedding_model(),
                        "loaded vector store"
                    );
                    Some(Arc::new(snapshot))
                }
                Err(e) => {
                    warn!(path, error = %e, "refusing persisted vector store, rebuild required");
                    None
                }
            },
            Ok(None) => {
                info!(path, "no vector store found");
                None
            }
            Err(e) => {
                warn!(path, error = %e, "failed to load vector store");
                None
            }
        };

        let is_loaded = loaded.is_some();
        *self.current.write() = loaded;
        is_loaded
    }

    /// Returns `true` if a snapshot is installed.
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Returns the current snapshot, if loaded.
    pub fn snapshot(&self) -> Option<Arc<StoreSnapshot>> {
        self.current.read().clone()
    }

    /// Waits for exclusive rebuild rights.
    ///
    /// Searches keep running against the current snapshot until the guard commits.
    pub async fn begin_rebuild(&self) -> RebuildGuard<'_, P> {
        RebuildGuard {
            store: self,
            _writer: self.writer.lock().await,
        }
    }

    /// Unloads the store and removes its persisted artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if artifacts cannot be removed; the store is unloaded regardless.
    pub async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        *self.current.write() = None;
        self.persistence.clear()?;
        info!(path = %self.persistence.path().display(), "vector store cleared");
        Ok(())
    }
}

/// Exclusive right to replace the store, obtained from [`VectorStore::begin_rebuild`].
pub struct RebuildGuard<'a, P: Persistence> {
    store: &'a VectorStore<P>,
    _writer: MutexGuard<'a, ()>,
}

impl<P: Persistence> std::fmt::Debug for RebuildGuard<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildGuard")
            .field("store", self.store)
            .finish_non_exhaustive()
    }
}

impl<P: Persistence> RebuildGuard<'_, P> {
    /// Persists `snapshot` and installs it as the current store.
    ///
    /// # Errors
    ///
    /// Returns the persistence error; the previous snapshot stays installed in that case.
    pub fn commit(self, snapshot: StoreSnapshot) -> Result<Arc<StoreSnapshot>> {
        self.store.persistence.save(&snapshot)?;
        let snapshot = Arc::new(snapshot);
        *self.store.current.write() = Some(Arc::clone(&snapshot));
        info!(chunks = snapshot.len(), "installed rebuilt vector store");
        Ok(snapshot)
    }
}
