//! Persisted job report (the cross-run state file).
//!
//! This is the exact wire shape consumers rely on for resumability:
//!
//! ```json
//! {
//!   "processing_info": { "start_time": "...", "end_time": "...",
//!                        "input_folder": "...", "mode": "in-place",
//!                        "settings": {...}, "run_id": "..." },
//!   "summary": { "total_workflows": 3, "successful": 2,
//!                "failed": 1, "replaced_existing": 0 },
//!   "workflows": [ { "source_path": "...", "output_path": "...",
//!                    "status": "success", "error": null,
//!                    "timestamp": "...", "replaced_existing": false } ]
//! }
//! ```
//!
//! `status` の文字列（"success"/"failed"）は互換性契約なので変更禁止。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;
use super::settings::RenderSettings;

/// Where the images went this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// PNGs are written next to their source documents.
    InPlace,
    /// PNGs are collected into a separate output folder.
    OutputFolder,
}

/// Entry status on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
}

/// One record per document, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntry {
    pub source_path: String,
    pub output_path: String,
    pub status: EntryStatus,

    #[serde(default)]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub replaced_existing: bool,
}

impl WorkflowEntry {
    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }
}

/// Metadata about the run that produced (or extended) this report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// Start of the *first* run that contributed to this report; carried
    /// over across resumed runs.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub input_folder: String,
    pub mode: RunMode,
    pub settings: RenderSettings,
    pub run_id: RunId,
}

/// Aggregate counts over the merged entry list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_workflows: usize,
    pub successful: usize,
    pub failed: usize,
    pub replaced_existing: usize,
}

/// The whole persisted report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub processing_info: ProcessingInfo,
    pub summary: Summary,
    pub workflows: Vec<WorkflowEntry>,
}

impl JobReport {
    /// Recompute `total/successful/failed` from the entry list.
    /// `replaced_existing` is a per-run statistic and is supplied by the caller.
    pub fn summarize(entries: &[WorkflowEntry], replaced_existing: usize) -> Summary {
        let successful = entries.iter().filter(|e| e.is_success()).count();
        Summary {
            total_workflows: entries.len(),
            successful,
            failed: entries.len() - successful,
            replaced_existing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, status: EntryStatus) -> WorkflowEntry {
        WorkflowEntry {
            source_path: source.to_string(),
            output_path: format!("{source}.png"),
            status,
            error: None,
            timestamp: Utc::now(),
            replaced_existing: false,
        }
    }

    #[test]
    fn status_uses_the_contract_strings() {
        let s = serde_json::to_string(&EntryStatus::Success).unwrap();
        assert_eq!(s, "\"success\"");
        let s = serde_json::to_string(&EntryStatus::Failed).unwrap();
        assert_eq!(s, "\"failed\"");
    }

    #[test]
    fn mode_serializes_kebab_case() {
        let s = serde_json::to_string(&RunMode::InPlace).unwrap();
        assert_eq!(s, "\"in-place\"");
        let s = serde_json::to_string(&RunMode::OutputFolder).unwrap();
        assert_eq!(s, "\"output-folder\"");
    }

    #[test]
    fn summarize_counts_by_status() {
        let entries = vec![
            entry("a.json", EntryStatus::Success),
            entry("b.json", EntryStatus::Success),
            entry("c.json", EntryStatus::Failed),
        ];

        let summary = JobReport::summarize(&entries, 1);
        assert_eq!(summary.total_workflows, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.replaced_existing, 1);
    }

    #[test]
    fn entry_tolerates_missing_optional_fields() {
        let json = r#"{
            "source_path": "a.json",
            "output_path": "a.png",
            "status": "success",
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let e: WorkflowEntry = serde_json::from_str(json).unwrap();
        assert!(e.is_success());
        assert_eq!(e.error, None);
        assert!(!e.replaced_existing);
    }
}
