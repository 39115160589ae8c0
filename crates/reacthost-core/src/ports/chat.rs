//! ChatClient port - the chat platform as seen by the host.
//!
//! The engine never talks to a platform SDK directly. Gateways (a Discord
//! bot, the console demo, the recording client used in tests) implement this
//! trait and feed `ReactionAdd` events into `Engine::dispatch`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChannelId, GuildId, Member, MessageId, UserId};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

/// Whose reaction to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOwner {
    /// The bot's own reaction (the rendered button).
    Bot,
    User(UserId),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a message, returning its id.
    async fn send_message(&self, channel_id: &ChannelId, content: &str)
    -> Result<MessageId, ChatError>;

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ChatError>;

    /// Render a reaction as the bot.
    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ChatError>;

    async fn remove_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
        owner: &ReactionOwner,
    ) -> Result<(), ChatError>;

    async fn remove_all_reactions(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), ChatError>;

    async fn guild_member(&self, guild_id: &GuildId, user_id: &UserId)
    -> Result<Member, ChatError>;
}
