use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by tokenizer and embedder backends.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The HTTP client could not be built.
    #[error("invalid embedding client configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The request never produced a response (connect, timeout, body read).
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    RequestFailed {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The server answered 2xx with a body of the wrong shape.
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("failed to load tokenizer from {path}: {reason}")]
    TokenizerLoad { path: PathBuf, reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },
}
