//! Job state store.
//!
//! Owns the report file in the input folder: loading prior state, pruning
//! already-done work out of a batch, and persisting the merged report.
//!
//! # 設計メモ
//!
//! 読み込み失敗は致命的にしない。壊れた・読めないレポートは「前回状態なし」
//! として扱い、警告だけ出して全件レンダリングに退化する。スナップショットの
//! 再生成は冪等なので、安全側は常に「やり直す」こと。
//! 書き込みは同一ディレクトリ内の一時ファイル + rename で、途中で落ちても
//! 半端なレポートが残らないようにする。

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use crate::domain::{JobReport, RenderTask, TaskResult, WorkflowEntry};
use crate::error::Result;
use crate::reconcile::{merge_results, RunInfo};

/// Report file name, fixed per input folder.
pub const JOB_FILE_NAME: &str = "flowsnap-job.json";

/// What pruning removed from a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: usize,
    pub skipped: usize,
}

/// Handle on the report file of one input folder.
pub struct JobStateStore {
    root: PathBuf,
}

impl JobStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(JOB_FILE_NAME)
    }

    /// Load the prior report, if a readable one exists.
    ///
    /// Missing file means first run. An unreadable or corrupt file is
    /// downgraded to "no prior state" with a warning; every document will
    /// simply be rendered again.
    pub fn load(&self) -> Option<JobReport> {
        let path = self.path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read prior report, starting fresh");
                return None;
            }
        };

        match serde_json::from_str::<JobReport>(&raw) {
            Ok(report) => {
                tracing::info!(
                    path = %path.display(),
                    entries = report.workflows.len(),
                    successful = report.summary.successful,
                    "loaded prior report"
                );
                Some(report)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "prior report is corrupt, starting fresh");
                None
            }
        }
    }

    /// Index the prior report's successful entries by source path.
    pub fn index_successes(report: Option<&JobReport>) -> HashMap<String, WorkflowEntry> {
        report
            .map(|r| r.workflows.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|e| e.is_success())
            .map(|e| (e.source_path.clone(), e.clone()))
            .collect()
    }

    /// Drop tasks whose document already rendered successfully.
    ///
    /// `force` disables the skip entirely. Task order is preserved.
    pub fn prune(
        tasks: Vec<RenderTask>,
        successes: &HashMap<String, WorkflowEntry>,
        force: bool,
    ) -> (Vec<RenderTask>, PruneReport) {
        if force || successes.is_empty() {
            let report = PruneReport {
                kept: tasks.len(),
                skipped: 0,
            };
            return (tasks, report);
        }

        let total = tasks.len();
        let kept: Vec<RenderTask> = tasks
            .into_iter()
            .filter(|t| {
                let done = successes.contains_key(t.source_identity());
                if done {
                    tracing::debug!(task = t.display_name(), "already rendered, skipping");
                }
                !done
            })
            .collect();

        let report = PruneReport {
            kept: kept.len(),
            skipped: total - kept.len(),
        };
        (kept, report)
    }

    /// Merge this run's results into the prior report and write it out.
    ///
    /// The write is atomic: serialize to a temp file in the same directory,
    /// then rename over the report path.
    pub fn merge_and_persist(
        &self,
        prior: Option<&JobReport>,
        results: &[TaskResult],
        info: &RunInfo,
    ) -> Result<JobReport> {
        let report = merge_results(prior, results, info);

        let body = serde_json::to_vec_pretty(&report)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&body)?;
        tmp.persist(self.path()).map_err(|e| e.error)?;

        tracing::info!(
            path = %self.path().display(),
            total = report.summary.total_workflows,
            successful = report.summary.successful,
            failed = report.summary.failed,
            "report persisted"
        );
        Ok(report)
    }
}
