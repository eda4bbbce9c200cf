/// Errors that can arise when calling the Ollama API.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    /// Transport failures, timeouts and undecodable bodies.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("Ollama returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// The response carried a vector of unexpected length.
    #[error("expected a {expected}-dimensional embedding, got {actual}")]
    Dimension {
        /// Configured dimension.
        expected: usize,
        /// Returned dimension.
        actual: usize,
    },
}
