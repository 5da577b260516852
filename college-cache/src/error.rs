use common::errors::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the college cache.
///
/// Only `InvalidInput` is returned from lookups and writes; storage failures
/// there are logged and absorbed. `flush` surfaces them for explicit teardown.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidInput(msg) => AppError::validation(msg),
            other => AppError::storage(other.to_string()),
        }
    }
}
