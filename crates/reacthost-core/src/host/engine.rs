//! Engine - the registry of running instances.
//!
//! `Engine` is a cheap handle (`Clone`) around shared state. Gateways hand it
//! reaction events; the host binary uses it to start apps and, at shutdown,
//! to persist everything that is still running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::instance::{Instance, InstanceSeed};
use super::snapshot;
use crate::domain::{ChannelId, GuildId, InstanceId, ReactionAdd};
use crate::error::HostError;
use crate::ports::{ChatClient, Clock, IdGenerator, StorageBackend};
use crate::typed::{HostedApp, TypeRegistry};

struct EngineState {
    instances: Vec<Arc<Instance>>,
    stopped: bool,
}

pub(crate) struct EngineShared {
    state: RwLock<EngineState>,
    storage: Arc<dyn StorageBackend>,
    registry: Arc<TypeRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl EngineShared {
    /// Drop an instance from the running set. Returns whether it was there.
    pub(crate) async fn remove_instance(&self, id: InstanceId) -> bool {
        let mut state = self.state.write().await;
        match state.instances.iter().position(|i| i.id() == id) {
            Some(index) => {
                state.instances.remove(index);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    pub(crate) fn new(
        storage: Arc<dyn StorageBackend>,
        registry: Arc<TypeRegistry>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                state: RwLock::new(EngineState {
                    instances: Vec::new(),
                    stopped: false,
                }),
                storage,
                registry,
                clock,
                ids,
            }),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.shared.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.shared.clock
    }

    pub async fn is_stopped(&self) -> bool {
        self.shared.state.read().await.stopped
    }

    /// Running instances, in start order.
    pub async fn instances(&self) -> Vec<Arc<Instance>> {
        self.shared.state.read().await.instances.clone()
    }

    pub async fn instance(&self, id: InstanceId) -> Option<Arc<Instance>> {
        self.shared
            .state
            .read()
            .await
            .instances
            .iter()
            .find(|i| i.id() == id)
            .cloned()
    }

    pub(crate) fn seed(
        &self,
        app_id: impl Into<String>,
        chat: Arc<dyn ChatClient>,
        guild_id: GuildId,
        channel_id: ChannelId,
        idle_timeout: Duration,
    ) -> InstanceSeed {
        InstanceSeed {
            id: self.shared.ids.generate_instance_id(),
            app_id: app_id.into(),
            channel_id,
            guild_id,
            idle_timeout,
            engine: Arc::downgrade(&self.shared),
            chat,
            clock: Arc::clone(&self.shared.clock),
        }
    }

    /// Start `app` in a channel.
    ///
    /// `idle_timeout` of zero disables the idle sweep for this instance. The
    /// instance is only added to the engine once `Application::start`
    /// returned successfully.
    pub async fn start_app<A: HostedApp>(
        &self,
        chat: Arc<dyn ChatClient>,
        app: A,
        guild_id: GuildId,
        channel_id: ChannelId,
        idle_timeout: Duration,
    ) -> Result<Arc<Instance>, HostError> {
        if self.is_stopped().await {
            return Err(HostError::Stopping);
        }
        if !self.shared.registry.contains(A::APP_ID) {
            warn!(
                app_id = A::APP_ID,
                "starting an unregistered application, it will not survive a restart"
            );
        }

        let seed = self.seed(A::APP_ID, chat, guild_id, channel_id, idle_timeout);
        let instance = Instance::new(seed, Box::new(app));
        instance.start().await?;

        let mut state = self.shared.state.write().await;
        if state.stopped {
            drop(state);
            warn!(instance_id = %instance.id(), app_id = A::APP_ID, "engine stopped while the application was starting");
            instance.exit().await;
            return Err(HostError::Stopping);
        }
        // A timer armed in `start` may already have run the exit path, which
        // found nothing to detach.
        if instance.is_exiting() {
            drop(state);
            warn!(instance_id = %instance.id(), app_id = A::APP_ID, "application exited before it was registered");
            return Err(HostError::ExitedDuringStart(A::APP_ID.to_string()));
        }
        state.instances.push(Arc::clone(&instance));
        drop(state);

        info!(
            instance_id = %instance.id(),
            app_id = A::APP_ID,
            channel_id = %instance.channel_id(),
            "application started"
        );
        Ok(instance)
    }

    /// Hand a reaction to every instance in its channel.
    ///
    /// Each instance handles the event on its own task. The handles are
    /// returned for callers that want to wait; dropping them is fine.
    pub async fn dispatch(&self, event: ReactionAdd) -> Vec<JoinHandle<()>> {
        let targets: Vec<Arc<Instance>> = {
            let state = self.shared.state.read().await;
            if state.stopped {
                debug!(channel_id = %event.channel_id, "engine stopped, dropping reaction");
                return Vec::new();
            }
            state
                .instances
                .iter()
                .filter(|i| *i.channel_id() == event.channel_id)
                .cloned()
                .collect()
        };

        let event = Arc::new(event);
        targets
            .into_iter()
            .map(|instance| {
                let event = Arc::clone(&event);
                tokio::spawn(async move { instance.handle_reaction_add(&event).await })
            })
            .collect()
    }

    /// Exit every instance that has been idle past its timeout.
    pub async fn sweep_idle(&self) -> Vec<JoinHandle<()>> {
        let now = self.shared.clock.now();
        let instances = self.instances().await;

        instances
            .into_iter()
            .filter(|instance| !instance.is_exiting() && instance.is_idle(now))
            .map(|instance| {
                info!(
                    instance_id = %instance.id(),
                    app_id = %instance.app_id(),
                    last_activity = %instance.last_activity(),
                    "instance idle, exiting"
                );
                tokio::spawn(async move {
                    instance.exit().await;
                })
            })
            .collect()
    }

    /// Feed events from a gateway channel into `dispatch` until it closes.
    pub fn spawn_event_loop(&self, mut events: mpsc::Receiver<ReactionAdd>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.dispatch(event).await;
            }
            debug!("event channel closed");
        })
    }

    /// Stop accepting work and persist every running instance.
    ///
    /// Idempotent: only the first call writes, so a failed save is not
    /// retried by calling again. Instances are not exited; they are simply no
    /// longer reachable through the engine's dispatch.
    pub async fn stop_and_save_states(&self) -> Result<(), HostError> {
        let instances = {
            let mut state = self.shared.state.write().await;
            if state.stopped {
                return Ok(());
            }
            state.stopped = true;
            state.instances.clone()
        };

        info!(running = instances.len(), "engine stopped, saving application states");
        let records = snapshot::capture(&instances, &self.shared.registry).await;
        if let Err(err) = self.shared.storage.save_apps(&records).await {
            error!(records = records.len(), error = %err, "failed saving application states");
            return Err(err.into());
        }
        info!(saved = records.len(), "application states saved");
        Ok(())
    }

    /// Replace the running set with whatever the storage backend holds.
    ///
    /// Meant to run once at startup, before any dispatch. Returns how many
    /// instances came back.
    pub async fn restore_apps(&self, chat: Arc<dyn ChatClient>) -> Result<usize, HostError> {
        let records = self.shared.storage.load_apps().await?;
        let loaded = records.len();
        let restored = snapshot::restore(self, records, chat).await;

        // Timers re-armed by `load_state` may already have exited some.
        let mut state = self.shared.state.write().await;
        state.instances = restored
            .into_iter()
            .filter(|instance| !instance.is_exiting())
            .collect();
        let count = state.instances.len();
        drop(state);

        info!(loaded, restored = count, "applications restored");
        Ok(count)
    }
}
