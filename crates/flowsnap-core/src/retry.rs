//! Retry policy: how many attempts a task gets and how long to wait between
//! them.

use std::time::Duration;

/// Per-task retry policy.
///
/// The attempt counter resets per task, never per batch. The backoff is a
/// fixed delay: render failures here are dominated by slow page loads and
/// flaky browser sessions, where waiting longer does not change the odds the
/// way it does for congested remote services.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per task (first try included).
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        self.backoff
    }
}
