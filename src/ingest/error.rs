//! Ingestion error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StoreError;

/// Errors that abort an ingestion run. Nothing is committed when one is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line is not a valid JSON row of the expected shape.
    #[error("failed to parse {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A row parsed but carries an unusable value.
    #[error("malformed row at {path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Two rows (or a row and the existing store) disagree on a point's category.
    #[error("UID '{uid}' has conflicting categories: expected '{expected}', but got '{actual}'")]
    ConflictingCategory {
        uid: String,
        expected: String,
        actual: String,
    },

    /// A score row references a UID the points dataset never declared.
    #[error("point UID '{uid}' not found in points dataset")]
    UndeclaredPoint { uid: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;
