//! reacthost-core
//!
//! Host engine for reaction-driven chat applications: an app posts messages,
//! registers emoji "buttons" on them, and gets called back when permitted
//! users press them.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, Action, ReactionAdd, Member, SerializedAppState）
//! - **ports**: 抽象化レイヤー（ChatClient, Clock, IdGenerator, StorageBackend）
//! - **host**: Engine, Instance, InstanceContext, EngineBuilder
//! - **typed**: Application trait, HostedApp, TypeRegistry
//! - **impls**: 実装（FileStorage, MemoryStorage, MemoryChat）
//! - **user_finder**: 参加者集めの再利用コンポーネント
//! - **config**: HostConfig
//! - **error**: HostError, AppError

pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod impls;
pub mod ports;
pub mod typed;
pub mod user_finder;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, HostConfig};
pub use error::{AppError, HostError};
pub use host::{BuildError, Engine, EngineBuilder, Instance, InstanceContext};
pub use typed::{Application, HostedApp, TypeRegistry};
pub use user_finder::UserFinder;
