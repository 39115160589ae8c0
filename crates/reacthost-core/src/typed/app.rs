//! Application trait - hosted app の契約
//!
//! Every callback receives the instance's `InstanceContext`. The context only
//! exists behind the instance's exclusive lock, so anything an app does with
//! it (register actions, edit the whitelist, request exit) is already
//! serialized with every other callback on the same instance.

use async_trait::async_trait;

use crate::domain::{Action, UserId};
use crate::error::AppError;
use crate::host::InstanceContext;

#[async_trait]
pub trait Application: Send + Sync {
    /// One-time setup. Not called when an instance is restored from storage.
    async fn start(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError>;

    /// Cleanup. Called exactly once, after the instance left the engine.
    async fn exit(&mut self, _ctx: &mut InstanceContext) -> Result<(), AppError> {
        Ok(())
    }

    /// A permitted user reacted on one of this instance's actions.
    async fn handle_action(
        &mut self,
        ctx: &mut InstanceContext,
        user_id: &UserId,
        action: &Action,
    ) -> Result<(), AppError>;

    /// A timer registered with `InstanceContext::schedule` fired.
    async fn handle_timer(
        &mut self,
        _ctx: &mut InstanceContext,
        _timer: &str,
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// Encode app state as a JSON document.
    fn serialize_state(&self) -> Result<Vec<u8>, AppError>;

    /// Rebuild state from `serialize_state` output.
    ///
    /// Anything the encoding could not carry (pending timers, derived caches)
    /// has to be re-established here.
    fn load_state(&mut self, ctx: &mut InstanceContext, data: &[u8]) -> Result<(), AppError>;
}

/// An application type that can be rebuilt from a snapshot.
///
/// # 命名規約
/// - `{namespace}.{app}.v{major}`
/// - e.g. `reacthost.tictactoe.v1`
pub trait HostedApp: Application + Default + 'static {
    const APP_ID: &'static str;
}
