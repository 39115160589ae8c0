//! IdGenerator port - ID 生成の抽象化

use ulid::Ulid;

use crate::domain::InstanceId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_instance_id(&self) -> InstanceId;
}

/// ULID generator whose timestamp part comes from a `Clock`.
///
/// With a `ManualClock` the timestamp is deterministic; the random part still
/// keeps ids unique.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_instance_id(&self) -> InstanceId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        InstanceId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
