//! ConsoleChat - 標準出力に描画する ChatClient
//!
//! Stands in for a chat platform: messages and reactions are printed, message
//! ids are `msg-1`, `msg-2`, ... and every user id is its own username.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use reacthost_core::domain::{ChannelId, GuildId, Member, MessageId, UserId};
use reacthost_core::ports::{ChatClient, ChatError, ReactionOwner};

#[derive(Debug, Default)]
pub struct ConsoleChat {
    next_message: AtomicU64,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep new message ids clear of `message_id`, e.g. one a restored app
    /// still listens on.
    pub fn reserve(&self, message_id: &MessageId) {
        let taken = message_id
            .as_str()
            .strip_prefix("msg-")
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = taken {
            self.next_message.fetch_max(n, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ChatClient for ConsoleChat {
    async fn send_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
    ) -> Result<MessageId, ChatError> {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = MessageId::new(format!("msg-{n}"));
        println!("[#{channel_id}] {message_id}\n{content}\n");
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ChatError> {
        println!("[#{channel_id}] {message_id} (edited)\n{content}\n");
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ChatError> {
        println!("[#{channel_id}] {message_id} +{emoji}");
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
        owner: &ReactionOwner,
    ) -> Result<(), ChatError> {
        match owner {
            ReactionOwner::Bot => println!("[#{channel_id}] {message_id} -{emoji}"),
            ReactionOwner::User(user_id) => {
                println!("[#{channel_id}] {message_id} -{emoji} (from {user_id})")
            }
        }
        Ok(())
    }

    async fn remove_all_reactions(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), ChatError> {
        println!("[#{channel_id}] {message_id} reactions cleared");
        Ok(())
    }

    async fn guild_member(
        &self,
        _guild_id: &GuildId,
        user_id: &UserId,
    ) -> Result<Member, ChatError> {
        Ok(Member::new(user_id.clone(), user_id.to_string()))
    }
}
