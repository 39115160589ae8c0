//! Instance - one running application bound to a channel.
//!
//! # ロック
//!
//! Every callback into the application runs under the instance's exclusive
//! lock, so an app never sees two of its own callbacks at once. Lookups that
//! only decide *whether* to dispatch take the shared lock.
//!
//! Lock order is instance, then engine. The engine never waits on an instance
//! lock while holding its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockMappedWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::InstanceContext;
use super::engine::EngineShared;
use crate::domain::{ChannelId, GuildId, InstanceId, ReactionAdd, SerializedAppState};
use crate::error::{AppError, HostError};
use crate::ports::{ChatClient, Clock, ReactionOwner};
use crate::typed::Application;

/// Everything the engine decides about an instance before it exists.
pub(crate) struct InstanceSeed {
    pub id: InstanceId,
    pub app_id: String,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub idle_timeout: Duration,
    pub engine: Weak<EngineShared>,
    pub chat: Arc<dyn ChatClient>,
    pub clock: Arc<dyn Clock>,
}

struct InstanceState {
    app: Box<dyn Application>,
    ctx: InstanceContext,
    exited: bool,
}

pub struct Instance {
    id: InstanceId,
    app_id: String,
    channel_id: ChannelId,
    guild_id: GuildId,
    idle_timeout: Duration,

    engine: Weak<EngineShared>,
    chat: Arc<dyn ChatClient>,
    clock: Arc<dyn Clock>,
    timers: CancellationToken,
    // Set before the engine is told to forget the instance. Readable under the
    // engine lock without touching the instance lock.
    exiting: AtomicBool,

    // never held across .await
    last_activity: Mutex<DateTime<Utc>>,
    state: RwLock<InstanceState>,
}

impl Instance {
    pub(crate) fn new(seed: InstanceSeed, app: Box<dyn Application>) -> Arc<Self> {
        Arc::new_cyclic(|me| {
            let timers = CancellationToken::new();
            let ctx = InstanceContext::new(
                seed.id,
                seed.channel_id.clone(),
                seed.guild_id.clone(),
                Arc::clone(&seed.chat),
                me.clone(),
                timers.clone(),
            );
            let now = seed.clock.now();

            Self {
                id: seed.id,
                app_id: seed.app_id,
                channel_id: seed.channel_id,
                guild_id: seed.guild_id,
                idle_timeout: seed.idle_timeout,
                engine: seed.engine,
                chat: seed.chat,
                clock: seed.clock,
                timers,
                exiting: AtomicBool::new(false),
                last_activity: Mutex::new(now),
                state: RwLock::new(InstanceState {
                    app,
                    ctx,
                    exited: false,
                }),
            }
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    /// Zero means the instance never times out.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        match self.last_activity.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn touch(&self) {
        let now = self.clock.now();
        match self.last_activity.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Whether the instance has been quiet for longer than its idle timeout.
    pub fn is_idle(&self, now: DateTime<Utc>) -> bool {
        if self.idle_timeout.is_zero() {
            return false;
        }
        let quiet = (now - self.last_activity())
            .to_std()
            .unwrap_or(Duration::ZERO);
        quiet > self.idle_timeout
    }

    pub async fn is_exited(&self) -> bool {
        self.state.read().await.exited
    }

    /// Whether an exit has begun. Unlike `is_exited` this never waits.
    pub(crate) fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    /// Exclusive access to the context, for code outside a callback.
    pub async fn context(&self) -> RwLockMappedWriteGuard<'_, InstanceContext> {
        RwLockWriteGuard::map(self.state.write().await, |state| &mut state.ctx)
    }

    /// Shared access to the context.
    pub async fn read_context(&self) -> RwLockReadGuard<'_, InstanceContext> {
        RwLockReadGuard::map(self.state.read().await, |state| &state.ctx)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub(crate) async fn start(&self) -> Result<(), HostError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if let Err(source) = state.app.start(&mut state.ctx).await {
            self.exiting.store(true, Ordering::SeqCst);
            state.exited = true;
            self.timers.cancel();
            return Err(HostError::StartFailed {
                app_id: self.app_id.clone(),
                source,
            });
        }

        if state.ctx.take_exit_request() {
            self.finish_exit(state).await;
            return Err(HostError::ExitedDuringStart(self.app_id.clone()));
        }
        Ok(())
    }

    /// Reinstate persisted host fields and hand the app its payload.
    pub(crate) async fn load(&self, record: SerializedAppState) -> Result<(), AppError> {
        let data = serde_json::to_vec(&record.app_data)?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state
            .ctx
            .restore(record.actions, record.user_ids, record.allow_all_users);

        if let Err(err) = state.app.load_state(&mut state.ctx, &data) {
            self.exiting.store(true, Ordering::SeqCst);
            state.exited = true;
            self.timers.cancel();
            return Err(err);
        }
        Ok(())
    }

    /// Exit the instance.
    ///
    /// Detaches from the engine before `Application::exit` runs. Returns
    /// `false` if the instance had already exited.
    pub async fn exit(&self) -> bool {
        self.exiting.store(true, Ordering::SeqCst);
        self.detach_from_engine().await;

        let mut guard = self.state.write().await;
        self.run_exit(&mut guard).await
    }

    async fn finish_exit(&self, state: &mut InstanceState) -> bool {
        if state.exited {
            return false;
        }
        self.exiting.store(true, Ordering::SeqCst);
        self.detach_from_engine().await;
        self.run_exit(state).await
    }

    async fn run_exit(&self, state: &mut InstanceState) -> bool {
        if state.exited {
            return false;
        }
        state.exited = true;
        self.timers.cancel();

        if let Err(err) = state.app.exit(&mut state.ctx).await {
            warn!(
                instance_id = %self.id,
                app_id = %self.app_id,
                error = %err,
                "application exit failed"
            );
        }
        info!(instance_id = %self.id, app_id = %self.app_id, "instance exited");
        true
    }

    async fn detach_from_engine(&self) -> bool {
        match self.engine.upgrade() {
            Some(engine) => engine.remove_instance(self.id).await,
            None => false,
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Route one reaction to the matching action, if any.
    pub async fn handle_reaction_add(&self, event: &ReactionAdd) {
        let (permitted, remove_if_unauthorized) = {
            let state = self.state.read().await;
            if state.exited {
                return;
            }
            let Some(action) = state.ctx.find_action(&event.message_id, &event.emoji) else {
                return;
            };
            (
                state.ctx.is_permitted(&event.user_id),
                action.remove_if_unauthorized,
            )
        };

        if !permitted {
            debug!(
                instance_id = %self.id,
                user_id = %event.user_id,
                emoji = %event.emoji,
                "reaction from a user outside the whitelist"
            );
            if remove_if_unauthorized {
                self.remove_user_reaction(event).await;
            }
            return;
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.exited {
            return;
        }

        // Another handler may have run between the two locks.
        if !state.ctx.is_permitted(&event.user_id) {
            debug!(instance_id = %self.id, user_id = %event.user_id, "user left the whitelist before dispatch");
            return;
        }
        let Some(action) = state
            .ctx
            .find_action(&event.message_id, &event.emoji)
            .cloned()
        else {
            debug!(
                instance_id = %self.id,
                emoji = %event.emoji,
                "action removed before it could run"
            );
            return;
        };

        self.touch();

        match state
            .app
            .handle_action(&mut state.ctx, &event.user_id, &action)
            .await
        {
            Ok(()) => {
                if action.remove_reaction_on_success {
                    self.remove_user_reaction(event).await;
                }
            }
            Err(err) => {
                error!(
                    instance_id = %self.id,
                    app_id = %self.app_id,
                    emoji = %action.emoji,
                    error = %err,
                    "error running action handler"
                );
            }
        }

        if state.ctx.take_exit_request() {
            self.finish_exit(state).await;
        }
    }

    pub(crate) async fn fire_timer(&self, timer: &str, token: &CancellationToken) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.exited || token.is_cancelled() {
            debug!(instance_id = %self.id, timer, "timer skipped");
            return;
        }

        if let Err(err) = state.app.handle_timer(&mut state.ctx, timer).await {
            error!(
                instance_id = %self.id,
                app_id = %self.app_id,
                timer,
                error = %err,
                "error running timer handler"
            );
        }

        if state.ctx.take_exit_request() {
            self.finish_exit(state).await;
        }
    }

    async fn remove_user_reaction(&self, event: &ReactionAdd) {
        let owner = ReactionOwner::User(event.user_id.clone());
        if let Err(err) = self
            .chat
            .remove_reaction(&event.channel_id, &event.message_id, &event.emoji, &owner)
            .await
        {
            warn!(
                instance_id = %self.id,
                user_id = %event.user_id,
                error = %err,
                "failed removing user reaction"
            );
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Capture the instance as a persistable record.
    pub async fn snapshot(&self) -> Result<SerializedAppState, AppError> {
        let state = self.state.read().await;
        let bytes = state.app.serialize_state()?;
        let app_data = serde_json::from_slice(&bytes)?;

        Ok(SerializedAppState {
            app_id: self.app_id.clone(),
            channel_id: self.channel_id.clone(),
            guild_id: self.guild_id.clone(),
            actions: state.ctx.actions().to_vec(),
            app_data,
            allow_all_users: state.ctx.allow_all_users(),
            user_ids: state.ctx.user_ids().to_vec(),
            idle_timeout_secs: self.idle_timeout.as_secs(),
        })
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}
