//! Score store error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::mmap::MmapError;

/// Errors raised by the KV engine and the score store built on it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file could not be mapped or failed archive validation.
    #[error(transparent)]
    Mmap(#[from] MmapError),

    /// The archive validated but its contents break an engine invariant.
    #[error("store file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The file was written by an incompatible engine version.
    #[error("store file {path} has format version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// Another live writer holds the lock on `lock_path`.
    #[error("store {path} is locked by another writer ({lock_path} is held)")]
    Locked { path: PathBuf, lock_path: PathBuf },

    /// A point UID has no record in the store.
    #[error("point UID '{uid}' not found")]
    NotFound { uid: String },

    /// Store image serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored record could not be decoded.
    #[error("failed to decode record for '{uid}': {message}")]
    Decode { uid: String, message: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
