//! Progress events emitted by the dispatcher.
//!
//! Listeners are pure consumers: they observe, they never influence
//! scheduling. Counters derived from these events live with whoever folds
//! them (the coordinating loop or a [`StatusBoard`](super::worker::StatusBoard)),
//! never in shared mutable state.

use super::result::TaskResult;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Dispatch is about to begin.
    BatchStarted { total: usize, workers: usize },

    /// A worker slot picked up a task.
    TaskStarted {
        worker_id: usize,
        display_name: String,
    },

    /// A task yielded its one and only result.
    TaskCompleted {
        worker_id: usize,
        result: TaskResult,
    },

    /// Every submitted task has been accounted for.
    BatchFinished { successful: usize, failed: usize },
}
