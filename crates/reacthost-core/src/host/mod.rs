//! Host - エンジンとインスタンス
//!
//! - `Engine`: running instances, reaction dispatch, idle sweep, save/restore
//! - `Instance`: one app bound to a channel, behind its own lock
//! - `InstanceContext`: what an app may touch from inside a callback

pub mod builder;
pub mod context;
pub mod engine;
pub mod instance;
mod snapshot;
mod sweeper;

pub use builder::{BuildError, DEFAULT_STATE_PATH, EngineBuilder};
pub use context::InstanceContext;
pub use engine::Engine;
pub use instance::Instance;
