//! In-memory snapshot storage (テスト用・埋め込み用).

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::SerializedAppState;
use crate::ports::{StorageBackend, StorageResult};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<Vec<SerializedAppState>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SerializedAppState>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn records(&self) -> Vec<SerializedAppState> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// How many times `save_apps` ran.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn save_apps(&self, apps: &[SerializedAppState]) -> StorageResult<()> {
        *self.records.lock().unwrap_or_else(|e| e.into_inner()) = apps.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_apps(&self) -> StorageResult<Vec<SerializedAppState>> {
        Ok(self.records())
    }
}
