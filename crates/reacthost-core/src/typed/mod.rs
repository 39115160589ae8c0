//! Typed - アプリケーション契約と型レジストリ
//!
//! - **表層**: `HostedApp` (concrete type + `APP_ID`)
//! - **内部**: `Box<dyn Application>` built by a factory table keyed by id

pub mod app;
pub mod registry;

pub use self::app::{Application, HostedApp};
pub use self::registry::{AppFactory, RegistryError, TypeRegistry};
