//! Test applications and wiring shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::domain::{Action, Member, MessageId, UserId};
use crate::error::AppError;
use crate::host::{Engine, EngineBuilder, InstanceContext};
use crate::impls::{MemoryChat, MemoryStorage};
use crate::ports::{Clock, ManualClock, SystemClock};
use crate::typed::{Application, HostedApp};
use crate::user_finder::UserFinder;

pub(crate) async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.await.unwrap();
    }
}

// ============================================================================
// TestHost
// ============================================================================

pub(crate) struct TestHost {
    pub engine: Engine,
    pub chat: Arc<MemoryChat>,
    pub storage: Arc<MemoryStorage>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::build(Arc::new(SystemClock), Arc::new(MemoryStorage::new()), true)
    }

    pub fn with_clock(clock: Arc<ManualClock>) -> Self {
        Self::build(clock, Arc::new(MemoryStorage::new()), true)
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self::build(Arc::new(SystemClock), storage, true)
    }

    /// An engine with an empty registry.
    pub fn unregistered() -> Self {
        Self::build(Arc::new(SystemClock), Arc::new(MemoryStorage::new()), false)
    }

    fn build(clock: Arc<dyn Clock>, storage: Arc<MemoryStorage>, register: bool) -> Self {
        let mut builder = EngineBuilder::new();
        if register {
            builder = builder
                .register::<Recorder>()
                .unwrap()
                .register::<Counter>()
                .unwrap()
                .register::<Lobby>()
                .unwrap();
        }
        let engine = builder
            .storage_arc(storage.clone())
            .clock(clock)
            .build()
            .unwrap();

        Self {
            engine,
            chat: Arc::new(MemoryChat::new()),
            storage,
        }
    }
}

// ============================================================================
// Recorder - records everything, reacts to a handful of emojis
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct RecorderLog {
    pub starts: AtomicUsize,
    pub exits: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    handled: Mutex<Vec<(String, String)>>,
    timers: Mutex<Vec<String>>,
}

impl RecorderLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// (user, emoji) per handled action, in order.
    pub fn handled(&self) -> Vec<(String, String)> {
        self.handled.lock().unwrap().clone()
    }

    pub fn timers(&self) -> Vec<String> {
        self.timers.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Open,
    Private,
    Slow,
    Failing,
    ExitOnStart,
    LeaveAtOnce,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecorderState {
    message_id: Option<MessageId>,
    hits: Vec<String>,
    /// Re-arm the "leave" timer when loaded.
    #[serde(default)]
    leaving: bool,
}

/// Emojis registered by `Recorder::start`, all on one message:
/// - 👍 plain
/// - 🔁 / 💥 remove the reaction on success (💥 always fails)
/// - 🛑 requests exit
/// - 🎯 unregisters itself
/// - 🔒 removes unauthorized reactions
/// - ⏰ schedules a "ping" timer in 5s
///
/// A "leave" timer requests exit.
#[derive(Default)]
pub(crate) struct Recorder {
    state: RecorderState,
    mode: Mode,
    log: Arc<RecorderLog>,
}

impl Recorder {
    /// Only user whitelisted by a private recorder.
    pub const OWNER: &'static str = "owner";

    pub fn new(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::Open, log)
    }

    pub fn private(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::Private, log)
    }

    pub fn slow(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::Slow, log)
    }

    pub fn failing(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::Failing, log)
    }

    pub fn exit_on_start(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::ExitOnStart, log)
    }

    /// Arms an immediate "leave" timer from `start`.
    pub fn leave_at_once(log: Arc<RecorderLog>) -> Self {
        Self::with_mode(Mode::LeaveAtOnce, log)
    }

    fn with_mode(mode: Mode, log: Arc<RecorderLog>) -> Self {
        Self {
            state: RecorderState::default(),
            mode,
            log,
        }
    }
}

impl HostedApp for Recorder {
    const APP_ID: &'static str = "test.recorder.v1";
}

#[async_trait]
impl Application for Recorder {
    async fn start(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError> {
        self.log.starts.fetch_add(1, Ordering::SeqCst);
        if self.mode == Mode::Failing {
            return Err(AppError::new("refusing to start"));
        }

        let message_id = ctx.send_message("recorder").await?;
        self.state.message_id = Some(message_id.clone());
        let m = message_id;
        ctx.add_actions(vec![
            Action::new(m.clone(), "👍"),
            Action::new(m.clone(), "🔁").remove_reaction_on_success(),
            Action::new(m.clone(), "💥").remove_reaction_on_success(),
            Action::new(m.clone(), "🛑"),
            Action::new(m.clone(), "🎯"),
            Action::new(m.clone(), "🔒").remove_if_unauthorized(),
            Action::new(m, "⏰"),
        ])
        .await?;

        if self.mode == Mode::Private {
            ctx.add_users([UserId::new(Self::OWNER)]);
        } else {
            ctx.set_allow_all_users(true);
        }
        match self.mode {
            Mode::ExitOnStart => ctx.request_exit(),
            Mode::LeaveAtOnce => {
                self.state.leaving = true;
                ctx.schedule(Duration::ZERO, "leave");
            }
            _ => {}
        }
        Ok(())
    }

    async fn exit(&mut self, _ctx: &mut InstanceContext) -> Result<(), AppError> {
        self.log.exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_action(
        &mut self,
        ctx: &mut InstanceContext,
        user_id: &UserId,
        action: &Action,
    ) -> Result<(), AppError> {
        let active = self.log.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_active.fetch_max(active, Ordering::SeqCst);
        if self.mode == Mode::Slow {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.log
            .handled
            .lock()
            .unwrap()
            .push((user_id.to_string(), action.emoji.clone()));
        self.state.hits.push(action.emoji.clone());
        self.log.active.fetch_sub(1, Ordering::SeqCst);

        match action.emoji.as_str() {
            "💥" => return Err(AppError::new("boom")),
            "🛑" => ctx.request_exit(),
            "🎯" => ctx.remove_actions(std::slice::from_ref(action)).await,
            "⏰" => {
                ctx.schedule(Duration::from_secs(5), "ping");
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_timer(
        &mut self,
        ctx: &mut InstanceContext,
        timer: &str,
    ) -> Result<(), AppError> {
        self.log.timers.lock().unwrap().push(timer.to_string());
        if timer == "leave" {
            ctx.request_exit();
        }
        Ok(())
    }

    fn serialize_state(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(&self.state)?)
    }

    fn load_state(&mut self, ctx: &mut InstanceContext, data: &[u8]) -> Result<(), AppError> {
        self.state = serde_json::from_slice(data)?;
        if self.state.leaving {
            ctx.schedule(Duration::ZERO, "leave");
        }
        Ok(())
    }
}

// ============================================================================
// Counter - a second, minimal app type
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Counter {
    count: u64,
}

impl HostedApp for Counter {
    const APP_ID: &'static str = "test.counter.v1";
}

#[async_trait]
impl Application for Counter {
    async fn start(&mut self, _ctx: &mut InstanceContext) -> Result<(), AppError> {
        Ok(())
    }

    async fn handle_action(
        &mut self,
        _ctx: &mut InstanceContext,
        _user_id: &UserId,
        _action: &Action,
    ) -> Result<(), AppError> {
        self.count += 1;
        Ok(())
    }

    fn serialize_state(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn load_state(&mut self, _ctx: &mut InstanceContext, data: &[u8]) -> Result<(), AppError> {
        *self = serde_json::from_slice(data)?;
        Ok(())
    }
}

// ============================================================================
// Lobby - a UserFinder and nothing else
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct LobbyLog {
    confirmed: Mutex<Option<Vec<Member>>>,
    confirmations: AtomicUsize,
}

impl LobbyLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn confirmed(&self) -> Option<Vec<Member>> {
        self.confirmed.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }

    /// Give a fired timer task the chance to finish.
    pub async fn wait_confirmed(&self) {
        for _ in 0..100 {
            if self.confirmed().is_some() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LobbyState {
    finder: UserFinder,
    started_with: Vec<String>,
}

pub(crate) struct Lobby {
    state: LobbyState,
    log: Arc<LobbyLog>,
}

impl Lobby {
    pub fn new(users_needed: usize, log: Arc<LobbyLog>) -> Self {
        Self {
            state: LobbyState {
                finder: UserFinder::new(users_needed),
                started_with: Vec::new(),
            },
            log,
        }
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(2, LobbyLog::new())
    }
}

impl HostedApp for Lobby {
    const APP_ID: &'static str = "test.lobby.v1";
}

#[async_trait]
impl Application for Lobby {
    async fn start(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError> {
        self.state.finder.start(ctx).await
    }

    async fn handle_action(
        &mut self,
        ctx: &mut InstanceContext,
        user_id: &UserId,
        action: &Action,
    ) -> Result<(), AppError> {
        self.state.finder.handle_action(ctx, user_id, action).await?;
        Ok(())
    }

    async fn handle_timer(
        &mut self,
        ctx: &mut InstanceContext,
        timer: &str,
    ) -> Result<(), AppError> {
        if let Some(players) = self.state.finder.handle_timer(ctx, timer).await? {
            self.state.started_with = players.iter().map(|m| m.username.clone()).collect();
            *self.log.confirmed.lock().unwrap() = Some(players);
            self.log.confirmations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn serialize_state(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(&self.state)?)
    }

    fn load_state(&mut self, ctx: &mut InstanceContext, data: &[u8]) -> Result<(), AppError> {
        self.state = serde_json::from_slice(data)?;
        self.state.finder.resume(ctx);
        Ok(())
    }
}
