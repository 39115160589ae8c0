//! Action - a reaction emoji on a message bound to app behaviour.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::MessageId;

/// Application-defined key/value payload carried by an action.
///
/// The payload goes through JSON when instances are persisted, so numbers may
/// come back as floats. The typed getters accept every encoding a round trip
/// can produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionData(Map<String, Value>);

impl ActionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn int64(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
            .or_else(|| value.as_f64().map(|v| v as i64))
    }

    pub fn int(&self, key: &str) -> Option<usize> {
        self.int64(key).and_then(|v| usize::try_from(v).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A registered action on one instance.
///
/// Identity is the (message id, emoji) pair; two actions with the same pair
/// are the same button as far as dispatch and removal are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub message_id: MessageId,
    pub emoji: String,

    #[serde(default, skip_serializing_if = "ActionData::is_empty")]
    pub data: ActionData,

    /// Remove the reacting user's reaction after the handler succeeds.
    #[serde(default)]
    pub remove_reaction_on_success: bool,

    /// Remove reactions placed by users the instance does not accept.
    #[serde(default)]
    pub remove_if_unauthorized: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Action {
    pub fn new(message_id: MessageId, emoji: impl Into<String>) -> Self {
        Self {
            message_id,
            emoji: emoji.into(),
            data: ActionData::new(),
            remove_reaction_on_success: false,
            remove_if_unauthorized: false,
            name: None,
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.set(key, value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn remove_reaction_on_success(mut self) -> Self {
        self.remove_reaction_on_success = true;
        self
    }

    pub fn remove_if_unauthorized(mut self) -> Self {
        self.remove_if_unauthorized = true;
        self
    }

    pub fn matches(&self, message_id: &MessageId, emoji: &str) -> bool {
        self.message_id == *message_id && self.emoji == emoji
    }

    /// Same (message id, emoji) identity.
    pub fn same_target(&self, other: &Action) -> bool {
        self.matches(&other.message_id, &other.emoji)
    }
}
