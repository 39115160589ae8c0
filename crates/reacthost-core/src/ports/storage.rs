//! StorageBackend port - snapshot persistence.
//!
//! Backends only move `SerializedAppState` records. Capturing records from
//! live instances and turning records back into instances is the engine's
//! job (see `host::snapshot`), so a backend can be tested without any app.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::SerializedAppState;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("deserialization error at {path}: {message}")]
    FileDeserialization { path: PathBuf, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    pub fn file_deserialization(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Replace the stored snapshot with `apps`.
    async fn save_apps(&self, apps: &[SerializedAppState]) -> StorageResult<()>;

    /// Load the stored snapshot. Nothing stored is an empty list, not an error.
    async fn load_apps(&self) -> StorageResult<Vec<SerializedAppState>>;
}
