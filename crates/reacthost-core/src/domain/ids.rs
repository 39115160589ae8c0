//! Domain identifiers (strongly-typed IDs).
//!
//! Two families live here:
//! - `ChatId<T>`: identifiers handed to us by the chat platform (channels,
//!   guilds, messages, users). They are opaque strings; the phantom marker keeps
//!   a `ChannelId` from being passed where a `UserId` is expected.
//! - `InstanceId`: ULID assigned by the engine to every running instance.
//!   Time-sortable, so log lines and snapshots order naturally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each chat id kind.
pub trait IdMarker: Send + Sync + 'static {
    /// Human readable kind, used in `Debug` output.
    fn kind() -> &'static str;
}

/// Platform-issued identifier.
///
/// Serializes as the bare string (`#[serde(transparent)]`), which keeps the
/// persisted format readable: `"channel_id": "1234"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> ChatId<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> From<&str> for ChatId<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for ChatId<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for ChatId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: IdMarker> fmt::Debug for ChatId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::kind(), self.value)
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {}

impl IdMarker for Channel {
    fn kind() -> &'static str {
        "ChannelId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Guild {}

impl IdMarker for Guild {
    fn kind() -> &'static str {
        "GuildId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Message {}

impl IdMarker for Message {
    fn kind() -> &'static str {
        "MessageId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn kind() -> &'static str {
        "UserId"
    }
}

pub type ChannelId = ChatId<Channel>;
pub type GuildId = ChatId<Guild>;
pub type MessageId = ChatId<Message>;
pub type UserId = ChatId<User>;

/// Identifier of one running instance.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(Ulid);

impl InstanceId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for InstanceId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inst-{}", self.0)
    }
}
