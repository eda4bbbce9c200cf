//! Per-page text extraction from PDF documents.
//!
//! Ingestion needs the text of every page together with its page number, so that chunks can
//! cite where they came from. Pages without a text layer are skipped; scanned documents need
//! OCR before they can be indexed.
//!
//! ```rust,no_run
//! use shelf_pdf::PdfReader;
//!
//! for page in PdfReader::from_path("handbook.pdf").pages()? {
//!     println!("page {}: {} chars", page.number, page.text.chars().count());
//! }
//! # Ok::<(), shelf_pdf::PdfError>(())
//! ```

mod error;
mod parser;

pub use error::{PdfError, Result};

use lopdf::Document;
use std::path::{Path, PathBuf};

/// Normalised text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Page text with lines trimmed and blank lines removed.
    pub text: String,
}

/// PDF reader entrypoint.
#[derive(Debug, Clone)]
pub struct PdfReader {
    source: PdfSource,
}

#[derive(Debug, Clone)]
enum PdfSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl PdfReader {
    /// Build a reader from a PDF file path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PdfSource::Path(path.into()),
        }
    }

    /// Build a reader from PDF bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: PdfSource::Bytes(bytes.into()),
        }
    }

    /// Extracts the non-empty pages in page order.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Io`] if the file cannot be read and [`PdfError::Parse`] if it is not
    /// a PDF.
    pub fn pages(&self) -> Result<Vec<PageText>> {
        let name = self.source_name();
        let doc = match &self.source {
            PdfSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| PdfError::Io {
                    path: path.clone(),
                    source,
                })?;
                Document::load_mem(&bytes)
            }
            PdfSource::Bytes(bytes) => Document::load_mem(bytes),
        }
        .map_err(|e| PdfError::Parse {
            source_name: name.clone(),
            message: e.to_string(),
        })?;
        Ok(parser::extract_pages(&doc, &name))
    }

    /// Returns source path if available.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            PdfSource::Path(path) => Some(path.as_path()),
            PdfSource::Bytes(_) => None,
        }
    }

    fn source_name(&self) -> String {
        self.source_path()
            .and_then(Path::file_name)
            .map_or_else(|| "memory".to_string(), |name| name.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_errors() {
        let reader = PdfReader::from_bytes(b"not-a-pdf".to_vec());
        assert!(matches!(reader.pages(), Err(PdfError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let reader = PdfReader::from_path("/nonexistent/handbook.pdf");
        assert!(matches!(reader.pages(), Err(PdfError::Io { .. })));
        assert_eq!(reader.source_name(), "handbook.pdf");
    }
}
