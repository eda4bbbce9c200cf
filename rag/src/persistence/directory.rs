//! Directory persistence: rkyv index file, JSON metadata blob and a plain-text excerpt.

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{from_bytes, to_bytes};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dedup::char_prefix;
use crate::error::{RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::store::StoreSnapshot;
use crate::types::{Metadata, PAGE_KEY, SOURCE_KEY};

use super::Persistence;

/// Binary index file name.
pub const INDEX_FILE: &str = "index.rkyv";
/// Chunk and metadata file name.
pub const METADATA_FILE: &str = "metadata.json";
/// Human-readable debug excerpt file name.
pub const EXCERPT_FILE: &str = "debug_excerpt.txt";

const FORMAT_VERSION: u32 = 1;

/// Vector payload, serialized with rkyv.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
struct IndexFile {
    dimension: u64,
    vectors: Vec<f32>,
}

#[derive(Serialize)]
struct MetadataFileRef<'a> {
    version: u32,
    embedding_model: &'a str,
    count: usize,
    chunks: &'a [String],
    metadata: &'a [Metadata],
}

#[derive(Deserialize)]
struct MetadataFile {
    version: u32,
    embedding_model: String,
    count: usize,
    chunks: Vec<String>,
    metadata: Vec<Metadata>,
}

/// Stores a snapshot as files inside one directory.
///
/// | File | Content |
/// |------|---------|
/// | `index.rkyv` | vector dimension and row-major vectors |
/// | `metadata.json` | chunks, metadata records, embedding model, count |
/// | `debug_excerpt.txt` | first chunks, truncated, for operators |
///
/// Every file is written to a temporary sibling and renamed into place.
///
/// # Example
///
/// ```rust,no_run
/// use shelf_rag::persistence::{DirectoryPersistence, Persistence};
///
/// let persistence = DirectoryPersistence::new("./data/vector_store");
/// let snapshot = persistence.load().unwrap();
/// assert!(snapshot.is_none() || snapshot.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryPersistence {
    dir: PathBuf,
    excerpt_chunks: usize,
    excerpt_chars: usize,
}

impl DirectoryPersistence {
    /// Creates a directory backend writing a 20-chunk excerpt.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            excerpt_chunks: 20,
            excerpt_chars: 200,
        }
    }

    /// Configures the debug excerpt; zero chunks disables it.
    #[must_use]
    pub const fn with_excerpt(mut self, chunks: usize, chars_per_chunk: usize) -> Self {
        self.excerpt_chunks = chunks;
        self.excerpt_chars = chars_per_chunk;
        self
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn render_excerpt(&self, snapshot: &StoreSnapshot) -> String {
        let mut out = format!(
            "Vector store excerpt: {} chunks, embedding model {}\n",
            snapshot.len(),
            snapshot.embedding_model()
        );
        let shown = snapshot
            .chunks()
            .iter()
            .zip(snapshot.metadata_records())
            .take(self.excerpt_chunks)
            .enumerate();
        for (position, (chunk, metadata)) in shown {
            let source = metadata.get(SOURCE_KEY).map_or("unknown", String::as_str);
            let page = metadata.get(PAGE_KEY).map_or("?", String::as_str);
            let excerpt = char_prefix(chunk, self.excerpt_chars);
            let ellipsis = if excerpt.len() < chunk.len() { "..." } else { "" };
            let _ = write!(
                out,
                "\n--- chunk {position} ({source}, page {page}) ---\n{excerpt}{ellipsis}\n"
            );
        }
        out
    }
}

fn persistence_error(path: &Path) -> impl FnOnce(std::io::Error) -> RagError + '_ {
    move |source| RagError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(persistence_error(&tmp))?;
    fs::rename(&tmp, path).map_err(persistence_error(path))
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(persistence_error(path)(e)),
        _ => Ok(()),
    }
}

impl Persistence for DirectoryPersistence {
    fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(persistence_error(&self.dir))?;

        let index = IndexFile {
            dimension: u64::try_from(snapshot.dimension())
                .map_err(|e| RagError::Serialization(e.to_string()))?,
            vectors: snapshot.index().as_flat().to_vec(),
        };
        let index_bytes =
            to_bytes::<RkyvError>(&index).map_err(|e| RagError::Serialization(e.to_string()))?;

        let metadata = MetadataFileRef {
            version: FORMAT_VERSION,
            embedding_model: snapshot.embedding_model(),
            count: snapshot.len(),
            chunks: snapshot.chunks(),
            metadata: snapshot.metadata_records(),
        };
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| RagError::Serialization(e.to_string()))?;

        write_atomic(&self.file(INDEX_FILE), &index_bytes)?;
        write_atomic(&self.file(METADATA_FILE), &metadata_bytes)?;

        let excerpt = self.file(EXCERPT_FILE);
        if self.excerpt_chunks > 0 {
            write_atomic(&excerpt, self.render_excerpt(snapshot).as_bytes())?;
        } else {
            remove_if_present(&excerpt)?;
        }

        info!(
            dir = %self.dir.display(),
            chunks = snapshot.len(),
            dimension = snapshot.dimension(),
            "saved vector store"
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<StoreSnapshot>> {
        let metadata_path = self.file(METADATA_FILE);
        if !metadata_path.exists() {
            debug!(dir = %self.dir.display(), "no persisted vector store");
            return Ok(None);
        }

        let raw = fs::read(&metadata_path).map_err(persistence_error(&metadata_path))?;
        let file: MetadataFile =
            serde_json::from_slice(&raw).map_err(|e| RagError::Serialization(e.to_string()))?;
        if file.version != FORMAT_VERSION {
            return Err(RagError::Serialization(format!(
                "unsupported store format version {}",
                file.version
            )));
        }
        if file.count != file.chunks.len() {
            return Err(RagError::LengthMismatch {
                chunks: file.chunks.len(),
                metadata: file.metadata.len(),
                vectors: file.count,
            });
        }

        let index_path = self.file(INDEX_FILE);
        let bytes = fs::read(&index_path).map_err(persistence_error(&index_path))?;
        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(&bytes);
        let payload = from_bytes::<IndexFile, RkyvError>(&aligned)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        let dimension = usize::try_from(payload.dimension)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        let index = FlatIndex::from_flat(dimension, payload.vectors)?;

        let snapshot = StoreSnapshot::new(file.chunks, file.metadata, index, file.embedding_model)?;
        debug!(
            dir = %self.dir.display(),
            chunks = snapshot.len(),
            dimension = snapshot.index().dimension(),
            "read vector store"
        );
        Ok(Some(snapshot))
    }

    fn clear(&self) -> Result<()> {
        for name in [INDEX_FILE, METADATA_FILE, EXCERPT_FILE] {
            remove_if_present(&self.file(name))?;
        }
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.dir
    }
}
