//! UserFinder - 参加者集め
//!
//! A reusable lobby: posts a roster message with ➕/➖ buttons and collects
//! members until the target count is reached. Reaching the target arms a short
//! confirmation timer; anyone leaving before it fires disarms it.
//!
//! The owning app embeds a `UserFinder` in its state and forwards callbacks:
//!
//! ```ignore
//! async fn handle_action(&mut self, ctx, user_id, action) -> Result<(), AppError> {
//!     if self.finder.handle_action(ctx, user_id, action).await? {
//!         return Ok(());
//!     }
//!     // ... the app's own actions
//! }
//!
//! async fn handle_timer(&mut self, ctx, timer) -> Result<(), AppError> {
//!     if let Some(players) = self.finder.handle_timer(ctx, timer).await? {
//!         // roster confirmed
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{Action, Member, MessageId, UserId};
use crate::error::AppError;
use crate::host::InstanceContext;

pub const JOIN_EMOJI: &str = "➕";
pub const LEAVE_EMOJI: &str = "➖";

/// Timer name used for the confirmation.
pub const CONFIRM_TIMER: &str = "user_finder.confirm";

fn default_confirm_delay() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFinder {
    users: Vec<Member>,
    users_needed: usize,

    #[serde(default)]
    confirmed: bool,

    #[serde(default)]
    message_id: Option<MessageId>,

    #[serde(default)]
    join_action: Option<Action>,

    #[serde(default)]
    leave_action: Option<Action>,

    #[serde(skip, default = "default_confirm_delay")]
    confirm_delay: Duration,

    #[serde(skip)]
    pending: Option<CancellationToken>,
}

impl UserFinder {
    pub fn new(users_needed: usize) -> Self {
        Self {
            users: Vec::new(),
            users_needed,
            confirmed: false,
            message_id: None,
            join_action: None,
            leave_action: None,
            confirm_delay: default_confirm_delay(),
            pending: None,
        }
    }

    /// Seed the roster, e.g. with whoever started the app.
    pub fn with_users(mut self, users: Vec<Member>) -> Self {
        self.users = users;
        self
    }

    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    pub fn users(&self) -> &[Member] {
        &self.users
    }

    pub fn users_needed(&self) -> usize {
        self.users_needed
    }

    pub fn is_full(&self) -> bool {
        self.users.len() >= self.users_needed
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    pub fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    /// Open the lobby: everyone may react, roster message plus ➕/➖.
    pub async fn start(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError> {
        ctx.set_allow_all_users(true);
        self.render(ctx).await?;

        let message_id = self
            .message_id
            .clone()
            .ok_or_else(|| AppError::new("roster message was not posted"))?;
        let join = Action::new(message_id.clone(), JOIN_EMOJI).with_name("join");
        let leave = Action::new(message_id, LEAVE_EMOJI).with_name("leave");
        self.join_action = Some(join.clone());
        self.leave_action = Some(leave.clone());
        ctx.add_actions(vec![join, leave]).await?;

        if self.is_full() {
            self.arm(ctx);
        }
        Ok(())
    }

    /// Re-arm the confirmation after a restore. Call from `load_state`.
    pub fn resume(&mut self, ctx: &mut InstanceContext) {
        if !self.confirmed && self.is_full() {
            self.arm(ctx);
        }
    }

    /// Handle ➕/➖. Returns `false` if `action` is not one of ours.
    pub async fn handle_action(
        &mut self,
        ctx: &mut InstanceContext,
        user_id: &UserId,
        action: &Action,
    ) -> Result<bool, AppError> {
        if self.join_action.as_ref().is_some_and(|a| a.same_target(action)) {
            self.join(ctx, user_id).await?;
            return Ok(true);
        }
        if self.leave_action.as_ref().is_some_and(|a| a.same_target(action)) {
            self.leave(ctx, user_id).await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Handle the confirmation timer.
    ///
    /// Returns the final roster exactly once, when the roster is still full
    /// at the time the timer fires.
    pub async fn handle_timer(
        &mut self,
        ctx: &mut InstanceContext,
        timer: &str,
    ) -> Result<Option<Vec<Member>>, AppError> {
        if timer != CONFIRM_TIMER {
            return Ok(None);
        }
        self.pending = None;
        if self.confirmed || !self.is_full() {
            return Ok(None);
        }

        self.confirmed = true;
        let ours: Vec<Action> = self
            .join_action
            .take()
            .into_iter()
            .chain(self.leave_action.take())
            .collect();
        ctx.remove_actions(&ours).await;

        Ok(Some(self.users[..self.users_needed].to_vec()))
    }

    async fn join(&mut self, ctx: &mut InstanceContext, user_id: &UserId) -> Result<(), AppError> {
        if self.confirmed || self.users.iter().any(|u| u.user_id == *user_id) {
            return Ok(());
        }
        if self.is_full() {
            debug!(user_id = %user_id, "roster full, ignoring join");
            return Ok(());
        }

        let member = ctx.chat().guild_member(ctx.guild_id(), user_id).await?;
        self.users.push(member);
        if self.is_full() {
            self.arm(ctx);
        }
        self.render(ctx).await
    }

    async fn leave(&mut self, ctx: &mut InstanceContext, user_id: &UserId) -> Result<(), AppError> {
        if self.confirmed {
            return Ok(());
        }
        let before = self.users.len();
        self.users.retain(|u| u.user_id != *user_id);
        if self.users.len() == before {
            return Ok(());
        }

        if !self.is_full() {
            self.disarm();
        }
        self.render(ctx).await
    }

    fn arm(&mut self, ctx: &InstanceContext) {
        self.disarm();
        self.pending = Some(ctx.schedule(self.confirm_delay, CONFIRM_TIMER));
    }

    fn disarm(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    fn roster(&self) -> String {
        let mut content = String::from("**Looking for players.**\n```\n");
        for slot in 0..self.users_needed {
            match self.users.get(slot) {
                Some(member) => content.push_str(&member.display_name()),
                None => content.push_str("- open seat -"),
            }
            content.push('\n');
        }
        content.push_str("```\n");
        content.push_str(&format!(
            "React with {JOIN_EMOJI} to join or {LEAVE_EMOJI} to leave.\n"
        ));
        if self.is_full() {
            content.push_str("\nEveryone is here, starting shortly...");
        }
        content
    }

    async fn render(&mut self, ctx: &InstanceContext) -> Result<(), AppError> {
        let content = self.roster();
        match self.message_id.clone() {
            Some(message_id) => ctx.edit_message(&message_id, &content).await?,
            None => self.message_id = Some(ctx.send_message(&content).await?),
        }
        Ok(())
    }
}
