//! Per-task results.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::outcome::Outcome;
use super::report::{EntryStatus, WorkflowEntry};
use super::task::RenderTask;

/// The result of exactly one task. Created once, never mutated.
///
/// Results are matched to tasks by `source_identity`, never by position:
/// with a worker pool they arrive in completion order.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub source_identity: String,
    pub output_path: PathBuf,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    pub worker_id: usize,
    pub replaced_existing: bool,
}

impl TaskResult {
    pub fn success(
        task: &RenderTask,
        worker_id: usize,
        timestamp: DateTime<Utc>,
        replaced_existing: bool,
    ) -> Self {
        Self {
            source_identity: task.source_identity().to_string(),
            output_path: task.output_path().to_path_buf(),
            outcome: Outcome::Success,
            timestamp,
            worker_id,
            replaced_existing,
        }
    }

    pub fn failure(
        task: &RenderTask,
        reason: impl Into<String>,
        worker_id: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source_identity: task.source_identity().to_string(),
            output_path: task.output_path().to_path_buf(),
            outcome: Outcome::failure(reason),
            timestamp,
            worker_id,
            replaced_existing: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Convert into the persisted report entry shape.
    pub fn to_entry(&self) -> WorkflowEntry {
        WorkflowEntry {
            source_path: self.source_identity.clone(),
            output_path: path_to_string(&self.output_path),
            status: if self.is_success() {
                EntryStatus::Success
            } else {
                EntryStatus::Failed
            },
            error: self.outcome.reason().map(str::to_string),
            timestamp: self.timestamp,
            replaced_existing: self.replaced_existing,
        }
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> RenderTask {
        RenderTask::new(
            serde_json::json!({"name": "t"}),
            "t",
            "dir/t.json",
            "dir/t.png",
        )
    }

    #[test]
    fn success_converts_to_success_entry() {
        let r = TaskResult::success(&sample_task(), 2, Utc::now(), true);
        let entry = r.to_entry();

        assert_eq!(entry.source_path, "dir/t.json");
        assert_eq!(entry.output_path, "dir/t.png");
        assert_eq!(entry.status, EntryStatus::Success);
        assert_eq!(entry.error, None);
        assert!(entry.replaced_existing);
    }

    #[test]
    fn failure_converts_to_failed_entry_with_error_text() {
        let r = TaskResult::failure(&sample_task(), "browser crashed", 0, Utc::now());
        let entry = r.to_entry();

        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("browser crashed"));
        assert!(!entry.replaced_existing);
    }
}
