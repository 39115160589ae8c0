//! EngineBuilder - エンジンの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: `expect_apps` に挙げた app が未登録なら
//!   `build()` が失敗する。再起動後に snapshot を復元できない構成を早期に弾く。

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use super::engine::Engine;
use crate::config::HostConfig;
use crate::impls::FileStorage;
use crate::ports::{Clock, IdGenerator, StorageBackend, SystemClock, UlidGenerator};
use crate::typed::{HostedApp, RegistryError, TypeRegistry};

/// File used when no storage backend was configured.
pub const DEFAULT_STATE_PATH: &str = "reacthost_apps.json";

/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .register::<Game>()?
///     .expect_apps(&["reacthost.tictactoe.v1"])
///     .storage(FileStorage::new("apps.json"))
///     .build()?;
/// ```
pub struct EngineBuilder {
    registry: TypeRegistry,
    expected_apps: Option<Vec<String>>,
    storage: Option<Arc<dyn StorageBackend>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing application types: {0:?}. These apps were expected but not registered.")]
    MissingApps(Vec<String>),
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            expected_apps: None,
            storage: None,
            clock: None,
            ids: None,
        }
    }

    /// Register an application type so snapshots of it can be restored.
    pub fn register<A: HostedApp>(mut self) -> Result<Self, RegistryError> {
        self.registry.register::<A>()?;
        Ok(self)
    }

    /// App ids that must be registered for `build()` to succeed.
    pub fn expect_apps(mut self, app_ids: &[&str]) -> Self {
        self.expected_apps = Some(app_ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn storage(self, storage: impl StorageBackend + 'static) -> Self {
        self.storage_arc(Arc::new(storage))
    }

    pub fn storage_arc(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// File storage at the configured state path.
    pub fn config(self, config: &HostConfig) -> Self {
        self.storage(FileStorage::new(config.state_path.clone()))
    }

    pub fn build(self) -> Result<Engine, BuildError> {
        if let Some(expected_apps) = &self.expected_apps {
            let missing: Vec<String> = expected_apps
                .iter()
                .filter(|id| !self.registry.contains(id))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingApps(missing));
            }
        }

        let storage = match self.storage {
            Some(storage) => storage,
            None => {
                warn!(
                    path = DEFAULT_STATE_PATH,
                    "no storage backend configured, using file storage"
                );
                Arc::new(FileStorage::new(PathBuf::from(DEFAULT_STATE_PATH)))
            }
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(Engine::new(storage, Arc::new(self.registry), clock, ids))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
