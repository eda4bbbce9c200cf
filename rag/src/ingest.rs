//! Ingestion: files to chunks, chunks to vectors.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use shelf_core::{Embedding, EmbeddingModel};
use shelf_pdf::PdfReader;

use crate::chunking::Chunker;
use crate::dedup::content_hash;
use crate::error::{RagError, Result};
use crate::types::{Chunk, Document, Metadata, PAGE_KEY, SOURCE_KEY};

/// File extensions accepted by [`collect_sources`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Summary of an ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Files that produced at least one chunk.
    pub files: usize,
    /// Files that could not be read or parsed.
    pub skipped_files: Vec<PathBuf>,
    /// Chunks written to the store.
    pub chunks: usize,
    /// Exact duplicate chunks dropped.
    pub duplicates: usize,
    /// Chunks stored with a zero vector because embedding failed.
    pub zero_vectors: usize,
}

/// Lists ingestible files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`RagError::Persistence`] if the directory cannot be read.
pub fn collect_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let to_error = |source| RagError::Persistence {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_error)? {
        let path = entry.map_err(to_error)?.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if supported && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads one file into page documents tagged with `source` and `page`.
///
/// # Errors
///
/// Returns [`RagError::Pdf`] for unreadable PDFs and [`RagError::Persistence`] for unreadable
/// text files.
pub fn read_source(path: &Path) -> Result<Vec<Document>> {
    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let page_document = |number: u32, text: String| {
        let metadata = Metadata::from([
            (SOURCE_KEY.to_string(), source.clone()),
            (PAGE_KEY.to_string(), number.to_string()),
        ]);
        Document::with_metadata(format!("{source}#page_{number}"), text, metadata)
    };

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        let pages = PdfReader::from_path(path).pages()?;
        Ok(pages
            .into_iter()
            .map(|page| page_document(page.number, page.text))
            .collect())
    } else {
        let text = fs::read_to_string(path).map_err(|source| RagError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(vec![page_document(1, text)])
    }
}

/// Reads and chunks `paths`, skipping files that fail and exact duplicate chunks.
pub fn chunk_sources(
    chunker: &impl Chunker,
    paths: &[PathBuf],
    report: &mut IngestReport,
) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();

    for path in paths {
        let pages = match read_source(path) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable source");
                report.skipped_files.push(path.clone());
                continue;
            }
        };
        let before = chunks.len();
        for chunk in chunker.chunk(&pages) {
            if seen.insert(content_hash(&chunk.text)) {
                chunks.push(chunk);
            } else {
                report.duplicates += 1;
            }
        }
        let produced = chunks.len() - before;
        debug!(path = %path.display(), pages = pages.len(), chunks = produced, "chunked source");
        if produced > 0 {
            report.files += 1;
        }
    }

    chunks
}

/// Embeds `texts` in batches of `batch_size`.
///
/// A failing batch is retried one text at a time; a text that still fails, or comes back with
/// the wrong dimension, gets a zero vector so that positions stay aligned. Returns the vectors
/// and the number of zero-vector placeholders.
pub async fn embed_with_fallback<M: EmbeddingModel>(
    embedder: &M,
    texts: &[String],
    batch_size: usize,
) -> (Vec<Embedding>, usize) {
    let dimension = embedder.dim();
    let mut vectors = Vec::with_capacity(texts.len());
    let mut placeholders = 0usize;

    for (batch_number, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        match embedder.embed_documents(batch).await {
            Ok(batch_vectors)
                if batch_vectors.len() == batch.len()
                    && batch_vectors.iter().all(|v| v.len() == dimension) =>
            {
                vectors.extend(batch_vectors);
                continue;
            }
            Ok(batch_vectors) => warn!(
                batch = batch_number,
                expected = batch.len(),
                returned = batch_vectors.len(),
                "embedding batch returned malformed vectors, retrying per item"
            ),
            Err(e) => warn!(
                batch = batch_number,
                error = %e,
                "embedding batch failed, retrying per item"
            ),
        }

        for text in batch {
            match embedder.embed(text).await {
                Ok(vector) if vector.len() == dimension => vectors.push(vector),
                Ok(vector) => {
                    warn!(
                        expected = dimension,
                        actual = vector.len(),
                        "wrong embedding dimension, storing zero vector"
                    );
                    vectors.push(vec![0.0; dimension]);
                    placeholders += 1;
                }
                Err(e) => {
                    warn!(error = %e, "embedding failed, storing zero vector");
                    vectors.push(vec![0.0; dimension]);
                    placeholders += 1;
                }
            }
        }
    }

    if placeholders > 0 {
        warn!(placeholders, total = texts.len(), "some chunks were stored with zero vectors");
    } else {
        info!(total = texts.len(), "embedded all chunks");
    }
    (vectors, placeholders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SectionChunker;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FlakyEmbedder {
        batch_calls: AtomicUsize,
        single_calls: AtomicUsize,
    }

    impl EmbeddingModel for FlakyEmbedder {
        fn dim(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, text: &str) -> shelf_core::Result<Vec<f32>> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            match text {
                "poison" => anyhow::bail!("rejected"),
                "short" => Ok(vec![1.0]),
                _ => Ok(vec![1.0, 2.0]),
            }
        }

        async fn embed_documents(&self, texts: &[String]) -> shelf_core::Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t == "poison" || t == "short") {
                anyhow::bail!("batch rejected");
            }
            Ok(texts.iter().map(|_| vec![1.0, 2.0]).collect())
        }
    }

    fn flaky() -> FlakyEmbedder {
        FlakyEmbedder {
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn failing_items_become_zero_vectors() {
        let embedder = flaky();
        let texts: Vec<String> = ["a", "b", "poison", "c", "short", "d"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let (vectors, placeholders) = embed_with_fallback(&embedder, &texts, 2).await;

        assert_eq!(vectors.len(), 6);
        assert_eq!(placeholders, 2);
        assert_eq!(vectors[2], vec![0.0, 0.0]);
        assert_eq!(vectors[4], vec![0.0, 0.0]);
        assert_eq!(vectors[3], vec![1.0, 2.0]);
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 3);
        // Only the two failing batches are retried item by item.
        assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_input_embeds_nothing() {
        let embedder = flaky();
        let (vectors, placeholders) = embed_with_fallback(&embedder, &[], 5).await;
        assert!(vectors.is_empty());
        assert_eq!(placeholders, 0);
    }

    #[test]
    fn collects_supported_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.TXT"), "x").unwrap();
        fs::write(dir.path().join("a.md"), "x").unwrap();
        fs::write(dir.path().join("image.png"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let sources = collect_sources(dir.path()).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.TXT"]);
        assert!(collect_sources(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn text_files_chunk_with_source_metadata() {
        let dir = tempdir().unwrap();
        let body = "Students may renew a loan twice online before the due date.";
        fs::write(dir.path().join("loans.txt"), body).unwrap();
        fs::write(dir.path().join("loans-copy.md"), body).unwrap();
        fs::write(dir.path().join("broken.pdf"), "not a pdf").unwrap();
        let paths = collect_sources(dir.path()).unwrap();

        let mut report = IngestReport::default();
        let chunks = chunk_sources(&SectionChunker::default(), &paths, &mut report);

        assert_eq!(chunks.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.files, 1);
        assert_eq!(report.skipped_files, vec![dir.path().join("broken.pdf")]);
        assert_eq!(chunks[0].metadata[SOURCE_KEY], "loans-copy.md");
        assert_eq!(chunks[0].metadata[PAGE_KEY], "1");
        assert_eq!(chunks[0].text, body);
    }
}
