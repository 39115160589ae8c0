//! Ports - 抽象化レイヤー
//!
//! Traits at the seams to the outside world: the chat platform, time, id
//! generation and snapshot storage. Implementations live in `impls` (or in the
//! embedding binary, for the chat platform).

pub mod chat;
pub mod clock;
pub mod id_generator;
pub mod storage;

pub use self::chat::{ChatClient, ChatError, ReactionOwner};
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::storage::{StorageBackend, StorageError, StorageResult};
