//! Idle sweeper - 放置されたインスタンスの回収
//!
//! Runs `Engine::sweep_idle` on a fixed interval until cancelled.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::engine::Engine;

impl Engine {
    pub fn spawn_idle_sweeper(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let engine = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("idle sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let exiting = engine.sweep_idle().await;
                        if !exiting.is_empty() {
                            debug!(count = exiting.len(), "idle instances exiting");
                        }
                    }
                }
            }
        })
    }
}
