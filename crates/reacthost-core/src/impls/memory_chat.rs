//! MemoryChat - a `ChatClient` that records every call.
//!
//! Messages get sequential ids (`msg-1`, `msg-2`, ...). Member lookups answer
//! from a preset table and fall back to a member named after the user id.
//! Reaction renders can be made to fail per emoji.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::{ChannelId, GuildId, Member, MessageId, UserId};
use crate::ports::{ChatClient, ChatError, ReactionOwner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    SendMessage {
        channel_id: ChannelId,
        content: String,
    },
    EditMessage {
        channel_id: ChannelId,
        message_id: MessageId,
        content: String,
    },
    AddReaction {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
    },
    RemoveReaction {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
        owner: ReactionOwner,
    },
    RemoveAllReactions {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    GuildMember {
        guild_id: GuildId,
        user_id: UserId,
    },
}

#[derive(Debug, Default)]
pub struct MemoryChat {
    calls: Mutex<Vec<ChatCall>>,
    next_message: AtomicU64,
    messages: Mutex<HashMap<MessageId, String>>,
    members: Mutex<HashMap<UserId, Member>>,
    failing_emojis: Mutex<HashSet<String>>,
}

impl MemoryChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current content of a message sent through this client.
    pub fn message(&self, message_id: &MessageId) -> Option<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(message_id)
            .cloned()
    }

    pub fn add_member(&self, member: Member) {
        self.members
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(member.user_id.clone(), member);
    }

    /// Make `add_reaction` fail for `emoji`.
    pub fn fail_reactions_for(&self, emoji: impl Into<String>) {
        self.failing_emojis
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(emoji.into());
    }

    fn record(&self, call: ChatCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl ChatClient for MemoryChat {
    async fn send_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
    ) -> Result<MessageId, ChatError> {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = MessageId::new(format!("msg-{n}"));

        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message_id.clone(), content.to_string());
        self.record(ChatCall::SendMessage {
            channel_id: channel_id.clone(),
            content: content.to_string(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ChatError> {
        self.record(ChatCall::EditMessage {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            content: content.to_string(),
        });

        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        match messages.get_mut(message_id) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(ChatError::NotFound {
                entity: "message",
                id: message_id.to_string(),
            }),
        }
    }

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ChatError> {
        let failing = self
            .failing_emojis
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(emoji);
        if failing {
            return Err(ChatError::Request(format!("cannot react with {emoji}")));
        }

        self.record(ChatCall::AddReaction {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
        owner: &ReactionOwner,
    ) -> Result<(), ChatError> {
        self.record(ChatCall::RemoveReaction {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            emoji: emoji.to_string(),
            owner: owner.clone(),
        });
        Ok(())
    }

    async fn remove_all_reactions(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), ChatError> {
        self.record(ChatCall::RemoveAllReactions {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
        });
        Ok(())
    }

    async fn guild_member(
        &self,
        guild_id: &GuildId,
        user_id: &UserId,
    ) -> Result<Member, ChatError> {
        self.record(ChatCall::GuildMember {
            guild_id: guild_id.clone(),
            user_id: user_id.clone(),
        });

        let member = self
            .members
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned();
        Ok(member.unwrap_or_else(|| Member::new(user_id.clone(), user_id.to_string())))
    }
}
