//! Snapshot - running instances to records and back.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use super::engine::Engine;
use super::instance::Instance;
use crate::domain::SerializedAppState;
use crate::ports::ChatClient;
use crate::typed::TypeRegistry;

/// Serialize every instance whose app type can be rebuilt later.
///
/// Instances of unregistered types and instances whose app fails to encode
/// are logged and left out; one bad app does not cost the others.
pub(crate) async fn capture(
    instances: &[Arc<Instance>],
    registry: &TypeRegistry,
) -> Vec<SerializedAppState> {
    let mut records = Vec::with_capacity(instances.len());

    for instance in instances {
        if !registry.contains(instance.app_id()) {
            warn!(
                instance_id = %instance.id(),
                app_id = %instance.app_id(),
                "application type not registered, not saving it"
            );
            continue;
        }
        if instance.is_exited().await {
            continue;
        }

        match instance.snapshot().await {
            Ok(record) => records.push(record),
            Err(err) => error!(
                instance_id = %instance.id(),
                app_id = %instance.app_id(),
                error = %err,
                "failed serializing application state"
            ),
        }
    }

    records
}

/// Rebuild instances from records. `Application::start` is not called.
pub(crate) async fn restore(
    engine: &Engine,
    records: Vec<SerializedAppState>,
    chat: Arc<dyn ChatClient>,
) -> Vec<Arc<Instance>> {
    let mut restored = Vec::with_capacity(records.len());

    for record in records {
        let Some(app) = engine.registry().create(&record.app_id) else {
            warn!(app_id = %record.app_id, "unknown application id, skipping");
            continue;
        };

        let seed = engine.seed(
            record.app_id.clone(),
            Arc::clone(&chat),
            record.guild_id.clone(),
            record.channel_id.clone(),
            Duration::from_secs(record.idle_timeout_secs),
        );
        let instance = Instance::new(seed, app);

        if let Err(err) = instance.load(record).await {
            error!(
                instance_id = %instance.id(),
                app_id = %instance.app_id(),
                error = %err,
                "failed loading application state, skipping"
            );
            continue;
        }
        restored.push(instance);
    }

    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, ChannelId, GuildId, MessageId, UserId};
    use crate::impls::MemoryStorage;
    use crate::testing::{Recorder, TestHost};
    use crate::typed::HostedApp;
    use serde_json::json;

    fn record(app_data: serde_json::Value) -> SerializedAppState {
        SerializedAppState {
            app_id: Recorder::APP_ID.into(),
            channel_id: ChannelId::new("c1"),
            guild_id: GuildId::new("g1"),
            actions: vec![Action::new(MessageId::new("m1"), "👍")],
            app_data,
            allow_all_users: false,
            user_ids: vec![UserId::new("u1")],
            idle_timeout_secs: 30,
        }
    }

    #[tokio::test]
    async fn restore_reinstates_host_fields() {
        let host = TestHost::with_storage(Arc::new(MemoryStorage::new()));
        let records = vec![record(json!({ "message_id": "m1", "hits": ["👍"] }))];

        let restored = restore(&host.engine, records, host.chat.clone()).await;

        assert_eq!(restored.len(), 1);
        let instance = &restored[0];
        assert_eq!(instance.idle_timeout(), Duration::from_secs(30));
        let ctx = instance.read_context().await;
        assert_eq!(ctx.actions().len(), 1);
        assert!(ctx.is_permitted(&UserId::new("u1")));
        assert!(!ctx.is_permitted(&UserId::new("u2")));
    }

    #[tokio::test]
    async fn records_the_app_cannot_load_are_skipped() {
        let host = TestHost::new();
        let records = vec![
            record(json!("not an object")),
            record(json!({ "message_id": "m1", "hits": [] })),
        ];

        let restored = restore(&host.engine, records, host.chat.clone()).await;

        assert_eq!(restored.len(), 1);
    }

    #[tokio::test]
    async fn capture_skips_exited_instances() {
        let host = TestHost::new();
        let records = vec![
            record(json!({ "message_id": "m1", "hits": [] })),
            record(json!({ "message_id": "m2", "hits": [] })),
        ];
        let restored = restore(&host.engine, records, host.chat.clone()).await;
        restored[0].exit().await;

        let captured = capture(&restored, host.engine.registry()).await;

        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].app_data["message_id"], "m2");
    }
}
