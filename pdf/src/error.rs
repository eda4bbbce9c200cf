use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted while extracting PDF text.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The input bytes do not decode as a valid PDF structure.
    #[error("failed to parse PDF {source_name}: {message}")]
    Parse {
        /// File name or `memory` for in-memory input.
        source_name: String,
        /// Parser message.
        message: String,
    },
    /// The source PDF could not be read from the filesystem.
    #[error("failed to read PDF {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PdfError>;
