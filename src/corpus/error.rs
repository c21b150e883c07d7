//! Error types for the corpus store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing the on-disk corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// File system error (create dir, read, write, rename, list).
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// `metadata.json` could not be parsed or serialized.
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        /// The manifest path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl CorpusError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a manifest parse/serialize error.
    pub fn manifest(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Manifest {
            path: path.into(),
            source,
        }
    }
}
