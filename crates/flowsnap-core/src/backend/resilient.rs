//! Retry adapter over a raw render backend.
//!
//! The scheduler never sees backend errors: every task comes back as exactly
//! one [`TaskResult`], success or failure. That is the boundary contract —
//! per-task failures must not escalate past here.

use std::sync::Arc;

use crate::domain::{RenderTask, TaskResult};
use crate::ports::{Clock, RenderBackend};
use crate::retry::RetryPolicy;

pub struct ResilientRenderer {
    backend: Box<dyn RenderBackend>,
    policy: RetryPolicy,
    worker_id: usize,
    clock: Arc<dyn Clock>,
}

impl ResilientRenderer {
    pub fn new(
        backend: Box<dyn RenderBackend>,
        policy: RetryPolicy,
        worker_id: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            policy,
            worker_id,
            clock,
        }
    }

    /// Render one task, retrying transient failures up to the policy limit.
    ///
    /// The attempt counter is scoped to this task. Between attempts we sleep
    /// the policy's fixed backoff. `replaced_existing` is recorded when a
    /// successful render overwrote a file that existed before the first
    /// attempt.
    pub async fn render_task(&self, task: &RenderTask) -> TaskResult {
        let replaced_existing = task.output_path().exists();
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            tracing::debug!(
                task = task.display_name(),
                attempt,
                max_attempts = self.policy.max_attempts,
                "render attempt"
            );

            match self.backend.render(task).await {
                Ok(()) => {
                    tracing::info!(
                        task = task.display_name(),
                        worker_id = self.worker_id,
                        attempt,
                        "rendered"
                    );
                    return TaskResult::success(
                        task,
                        self.worker_id,
                        self.clock.now(),
                        replaced_existing,
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        task = task.display_name(),
                        worker_id = self.worker_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "render attempt failed"
                    );
                    last_error = err.to_string();

                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay()).await;
                    }
                }
            }
        }

        tracing::error!(
            task = task.display_name(),
            worker_id = self.worker_id,
            attempts = self.policy.max_attempts,
            "all retry attempts exhausted"
        );
        TaskResult::failure(
            task,
            format!(
                "failed after {} attempts: {last_error}",
                self.policy.max_attempts
            ),
            self.worker_id,
            self.clock.now(),
        )
    }
}
