//! Persisted form of a running instance.

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::ids::{ChannelId, GuildId, UserId};

/// One element of the persisted snapshot array.
///
/// `app_data` is whatever the application's `serialize_state` produced; it
/// must be a JSON document and is embedded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedAppState {
    pub app_id: String,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub app_data: serde_json::Value,
    #[serde(default)]
    pub allow_all_users: bool,
    #[serde(default)]
    pub user_ids: Vec<UserId>,
    /// Idle timeout in whole seconds, 0 = disabled.
    #[serde(default)]
    pub idle_timeout_secs: u64,
}
