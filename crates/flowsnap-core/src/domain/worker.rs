//! Ephemeral per-worker status for live progress reporting.
//!
//! スケジューラの状態ではなく「表示用のビュー」。永続化しない。
//! イベントを畳み込むだけなので、スケジューリングへの逆流はありません。

use chrono::{DateTime, Utc};

use super::events::ProgressEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Rendering,
    Completed,
}

/// Live view of one worker slot.
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    pub id: usize,
    pub current_task: Option<String>,
    pub phase: WorkerPhase,
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkerSlot {
    fn idle(id: usize) -> Self {
        Self {
            id,
            current_task: None,
            phase: WorkerPhase::Idle,
            started_at: None,
        }
    }
}

/// Folds [`ProgressEvent`]s into a consistent set of worker slots plus
/// success/failure counters. One instance per listener; no sharing.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    slots: Vec<WorkerSlot>,
    total: usize,
    successful: usize,
    failed: usize,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            total: 0,
            successful: 0,
            failed: 0,
        }
    }

    pub fn apply(&mut self, event: &ProgressEvent, now: DateTime<Utc>) {
        match event {
            ProgressEvent::BatchStarted { total, workers } => {
                self.total = *total;
                self.slots = (0..*workers).map(WorkerSlot::idle).collect();
            }
            ProgressEvent::TaskStarted {
                worker_id,
                display_name,
            } => {
                if let Some(slot) = self.slots.get_mut(*worker_id) {
                    slot.current_task = Some(display_name.clone());
                    slot.phase = WorkerPhase::Rendering;
                    slot.started_at = Some(now);
                }
            }
            ProgressEvent::TaskCompleted { worker_id, result } => {
                if result.is_success() {
                    self.successful += 1;
                } else {
                    self.failed += 1;
                }
                if let Some(slot) = self.slots.get_mut(*worker_id) {
                    // The slot shows the finished task until the dispatcher
                    // reports the worker's next assignment.
                    slot.phase = WorkerPhase::Completed;
                    slot.started_at = None;
                }
            }
            ProgressEvent::BatchFinished { .. } => {
                for slot in &mut self.slots {
                    slot.phase = WorkerPhase::Idle;
                    slot.current_task = None;
                    slot.started_at = None;
                }
            }
        }
    }

    pub fn slots(&self) -> &[WorkerSlot] {
        &self.slots
    }

    pub fn completed(&self) -> usize {
        self.successful + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed())
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, TaskResult};
    use std::path::PathBuf;

    fn result(identity: &str, worker_id: usize, ok: bool) -> TaskResult {
        TaskResult {
            source_identity: identity.to_string(),
            output_path: PathBuf::from(format!("{identity}.png")),
            outcome: if ok {
                Outcome::success()
            } else {
                Outcome::failure("boom")
            },
            timestamp: Utc::now(),
            worker_id,
            replaced_existing: false,
        }
    }

    #[test]
    fn board_tracks_slot_phases_and_counters() {
        let mut board = StatusBoard::new();
        let now = Utc::now();

        board.apply(
            &ProgressEvent::BatchStarted {
                total: 3,
                workers: 2,
            },
            now,
        );
        assert_eq!(board.slots().len(), 2);
        assert_eq!(board.remaining(), 3);

        board.apply(
            &ProgressEvent::TaskStarted {
                worker_id: 1,
                display_name: "a".to_string(),
            },
            now,
        );
        assert_eq!(board.slots()[1].phase, WorkerPhase::Rendering);
        assert_eq!(board.slots()[1].current_task.as_deref(), Some("a"));

        board.apply(
            &ProgressEvent::TaskCompleted {
                worker_id: 1,
                result: result("a.json", 1, true),
            },
            now,
        );
        assert_eq!(board.slots()[1].phase, WorkerPhase::Completed);
        assert_eq!(board.successful(), 1);
        assert_eq!(board.remaining(), 2);

        board.apply(
            &ProgressEvent::TaskCompleted {
                worker_id: 0,
                result: result("b.json", 0, false),
            },
            now,
        );
        assert_eq!(board.failed(), 1);
        assert_eq!(board.completed(), 2);
    }

    #[test]
    fn events_for_unknown_slots_are_ignored() {
        let mut board = StatusBoard::new();
        let now = Utc::now();
        board.apply(
            &ProgressEvent::BatchStarted {
                total: 1,
                workers: 1,
            },
            now,
        );

        // A worker id outside the pool must not panic the listener.
        board.apply(
            &ProgressEvent::TaskStarted {
                worker_id: 9,
                display_name: "x".to_string(),
            },
            now,
        );
        assert_eq!(board.slots().len(), 1);
    }
}
