//! Run ID generation through the Clock port.
//!
//! ULID = timestamp(48bit) + randomness(80bit)。Clock を差し替えると
//! timestamp 部分が固定できるので、テストで決定的に検証できる。

use ulid::Ulid;

use super::clock::Clock;
use crate::domain::RunId;

/// Generates the per-run identifier recorded in the job report.
pub struct RunIdGenerator<C> {
    clock: C,
}

impl<C: Clock> RunIdGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn generate(&self) -> RunId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        RunId::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
