//! Domain model (ids, actions, events, persisted records).

pub mod action;
pub mod event;
pub mod ids;
pub mod member;
pub mod state;

pub use action::{Action, ActionData};
pub use event::ReactionAdd;
pub use ids::{ChannelId, ChatId, GuildId, IdMarker, InstanceId, MessageId, UserId};
pub use member::Member;
pub use state::SerializedAppState;
