//! Result reconciliation.
//!
//! Pure merge of the prior report (if any) with this run's results. No I/O
//! here; persistence is the state store's job.
//!
//! # 設計メモ
//!
//! マージは「前回の成功 + 今回の全結果」。同じドキュメントが両方に
//! 現れた場合は今回の結果が勝つ（強制再実行の後は新しい状態が真実）。
//! 前回の失敗エントリは引き継がない。再実行対象か、入力から消えたか、
//! どちらにしても古い失敗を残す意味がないため。

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{JobReport, ProcessingInfo, RenderSettings, RunId, RunMode, TaskResult};

/// Metadata describing the run whose results are being merged.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: RunId,
    pub input_folder: String,
    pub mode: RunMode,
    pub settings: RenderSettings,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Merge this run's results into the prior report.
///
/// Carried-over prior successes come first (sorted by source path for a
/// deterministic report), followed by this run's results in completion
/// order. When a document appears in both, the new result wins. Prior
/// failures are dropped: either they were just retried, or their source is
/// gone.
pub fn merge_results(
    prior: Option<&JobReport>,
    results: &[TaskResult],
    info: &RunInfo,
) -> JobReport {
    let fresh: HashSet<&str> = results.iter().map(|r| r.source_identity.as_str()).collect();

    let mut entries: Vec<_> = prior
        .map(|p| p.workflows.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(|e| e.is_success() && !fresh.contains(e.source_path.as_str()))
        .cloned()
        .collect();
    entries.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    entries.extend(results.iter().map(TaskResult::to_entry));

    let replaced_existing = results.iter().filter(|r| r.replaced_existing).count();
    let summary = JobReport::summarize(&entries, replaced_existing);

    // start_time belongs to the first run that touched this folder.
    let start_time = prior
        .map(|p| p.processing_info.start_time)
        .unwrap_or(info.started_at);

    JobReport {
        processing_info: ProcessingInfo {
            start_time,
            end_time: info.finished_at,
            input_folder: info.input_folder.clone(),
            mode: info.mode,
            settings: info.settings,
            run_id: info.run_id,
        },
        summary,
        workflows: entries,
    }
}

/// Per-run statistics for the end-of-run summary. Scoped to this run only,
/// unlike [`Summary`](crate::domain::Summary) which covers the merged report.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub successful: usize,
    pub failed: usize,
    pub replaced_existing: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn compute(results: &[TaskResult], elapsed: Duration) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        Self {
            successful,
            failed: results.len() - successful,
            replaced_existing: results.iter().filter(|r| r.replaced_existing).count(),
            elapsed,
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    pub fn throughput_per_min(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total() as f64 * 60.0 / secs
    }
}
