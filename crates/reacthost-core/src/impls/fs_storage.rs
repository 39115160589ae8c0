//! File-based snapshot storage.
//!
//! All records live in one JSON array at a single path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use crate::domain::SerializedAppState;
use crate::ports::{StorageBackend, StorageError, StorageResult};

/// File-based implementation of `StorageBackend`.
///
/// Uses atomic writes (temp file + rename) so a crash mid-save leaves the
/// previous snapshot in place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn ensure_parent(&self) -> StorageResult<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::file_io(dir, e)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn save_apps(&self, apps: &[SerializedAppState]) -> StorageResult<()> {
        self.ensure_parent().await?;

        let content = serde_json::to_vec_pretty(apps)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, content)
            .await
            .map_err(|e| StorageError::file_io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::file_io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), count = apps.len(), "saved application states");
        Ok(())
    }

    async fn load_apps(&self) -> StorageResult<Vec<SerializedAppState>> {
        let content = match fs::read(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no saved application states");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::file_io(&self.path, e)),
        };

        let raw: Vec<Value> = serde_json::from_slice(&content)
            .map_err(|e| StorageError::file_deserialization(&self.path, e.to_string()))?;

        let mut apps = Vec::with_capacity(raw.len());
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<SerializedAppState>(value) {
                Ok(app) => apps.push(app),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        index,
                        error = %e,
                        "Failed to parse saved application, skipping"
                    );
                }
            }
        }

        Ok(apps)
    }
}
