//! Inbound chat events.

use serde::{Deserialize, Serialize};

use super::ids::{ChannelId, MessageId, UserId};

/// A user added a reaction to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdd {
    pub user_id: UserId,
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub emoji: String,
}

impl ReactionAdd {
    pub fn new(
        user_id: impl Into<UserId>,
        channel_id: impl Into<ChannelId>,
        message_id: impl Into<MessageId>,
        emoji: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            emoji: emoji.into(),
        }
    }
}
