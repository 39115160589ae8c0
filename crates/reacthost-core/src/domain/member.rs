use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// A guild member as returned by the chat platform's member lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
}

impl Member {
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            discriminator: String::new(),
        }
    }

    /// `name#1234`, or just `name` for accounts without a discriminator.
    pub fn display_name(&self) -> String {
        if self.discriminator.is_empty() || self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }
}
