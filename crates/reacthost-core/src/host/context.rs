//! InstanceContext - the mutable half of an instance, handed to app callbacks.
//!
//! An `InstanceContext` is only reachable through the instance's exclusive
//! lock: either as the `ctx` argument of an `Application` callback, or via
//! `Instance::context()`. Nothing in here locks on its own.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::instance::Instance;
use crate::domain::{Action, ChannelId, GuildId, InstanceId, MessageId, UserId};
use crate::ports::{ChatClient, ChatError, ReactionOwner};

pub struct InstanceContext {
    instance_id: InstanceId,
    channel_id: ChannelId,
    guild_id: GuildId,
    chat: Arc<dyn ChatClient>,
    instance: Weak<Instance>,
    timers: CancellationToken,

    actions: Vec<Action>,
    user_ids: Vec<UserId>,
    allow_all_users: bool,
    exit_requested: bool,
}

impl InstanceContext {
    pub(crate) fn new(
        instance_id: InstanceId,
        channel_id: ChannelId,
        guild_id: GuildId,
        chat: Arc<dyn ChatClient>,
        instance: Weak<Instance>,
        timers: CancellationToken,
    ) -> Self {
        Self {
            instance_id,
            channel_id,
            guild_id,
            chat,
            instance,
            timers,
            actions: Vec::new(),
            user_ids: Vec::new(),
            allow_all_users: false,
            exit_requested: false,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn chat(&self) -> &Arc<dyn ChatClient> {
        &self.chat
    }

    /// Post a message in the instance's channel.
    pub async fn send_message(&self, content: &str) -> Result<MessageId, ChatError> {
        self.chat.send_message(&self.channel_id, content).await
    }

    pub async fn edit_message(&self, message_id: &MessageId, content: &str) -> Result<(), ChatError> {
        self.chat
            .edit_message(&self.channel_id, message_id, content)
            .await
    }

    // ========================================================================
    // Actions
    // ========================================================================

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn find_action(&self, message_id: &MessageId, emoji: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.matches(message_id, emoji))
    }

    /// Register actions and render their reactions.
    ///
    /// All actions are registered before the first reaction is rendered. If a
    /// render fails the error is returned and the registrations stay in place.
    pub async fn add_actions(&mut self, actions: Vec<Action>) -> Result<(), ChatError> {
        self.actions.extend(actions.iter().cloned());

        for action in &actions {
            self.chat
                .add_reaction(&self.channel_id, &action.message_id, &action.emoji)
                .await?;
        }
        Ok(())
    }

    /// Unregister every action whose (message, emoji) matches one of `targets`
    /// and take the bot's reaction off for each.
    pub async fn remove_actions(&mut self, targets: &[Action]) {
        let mut removed: Vec<Action> = Vec::new();
        self.actions.retain(|action| {
            if !targets.iter().any(|t| t.same_target(action)) {
                return true;
            }
            if !removed.iter().any(|r| r.same_target(action)) {
                removed.push(action.clone());
            }
            false
        });

        for action in removed {
            if let Err(err) = self
                .chat
                .remove_reaction(
                    &self.channel_id,
                    &action.message_id,
                    &action.emoji,
                    &ReactionOwner::Bot,
                )
                .await
            {
                warn!(
                    instance_id = %self.instance_id,
                    message_id = %action.message_id,
                    emoji = %action.emoji,
                    error = %err,
                    "failed removing reaction"
                );
            }
        }
    }

    /// Unregister all actions and clear every reaction on the affected messages.
    pub async fn clear_actions(&mut self) {
        let actions = std::mem::take(&mut self.actions);

        let mut messages: Vec<MessageId> = Vec::new();
        for action in actions {
            if !messages.contains(&action.message_id) {
                messages.push(action.message_id);
            }
        }

        for message_id in messages {
            if let Err(err) = self
                .chat
                .remove_all_reactions(&self.channel_id, &message_id)
                .await
            {
                warn!(
                    instance_id = %self.instance_id,
                    message_id = %message_id,
                    error = %err,
                    "failed clearing reactions"
                );
            }
        }
    }

    // ========================================================================
    // Whitelist
    // ========================================================================

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn allow_all_users(&self) -> bool {
        self.allow_all_users
    }

    pub fn set_allow_all_users(&mut self, allow: bool) {
        self.allow_all_users = allow;
    }

    pub fn add_users(&mut self, user_ids: impl IntoIterator<Item = UserId>) {
        for user_id in user_ids {
            if !self.user_ids.contains(&user_id) {
                self.user_ids.push(user_id);
            }
        }
    }

    pub fn remove_users(&mut self, user_ids: &[UserId]) {
        self.user_ids.retain(|u| !user_ids.contains(u));
    }

    pub fn clear_users(&mut self) {
        self.user_ids.clear();
    }

    pub fn is_permitted(&self, user_id: &UserId) -> bool {
        self.allow_all_users || self.user_ids.contains(user_id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Ask the host to exit this instance once the current callback returns.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub(crate) fn take_exit_request(&mut self) -> bool {
        std::mem::take(&mut self.exit_requested)
    }

    /// Fire `Application::handle_timer(timer)` after `delay`, under the
    /// instance lock.
    ///
    /// Returns a token that cancels this timer. All timers are cancelled when
    /// the instance exits; a timer that wakes up after exit does nothing.
    pub fn schedule(&self, delay: Duration, timer: impl Into<String>) -> CancellationToken {
        let token = self.timers.child_token();
        let cancel = token.clone();
        let instance = self.instance.clone();
        let timer = timer.into();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            match instance.upgrade() {
                Some(instance) => instance.fire_timer(&timer, &cancel).await,
                None => debug!(timer = %timer, "timer fired after its instance was dropped"),
            }
        });

        token
    }

    pub(crate) fn restore(&mut self, actions: Vec<Action>, user_ids: Vec<UserId>, allow_all_users: bool) {
        self.actions = actions;
        self.user_ids = user_ids;
        self.allow_all_users = allow_all_users;
    }
}
