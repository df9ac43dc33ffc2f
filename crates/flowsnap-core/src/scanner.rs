//! Document discovery and validation.
//!
//! Boundary component: finds workflow JSON files under the input root and
//! applies the minimal structural check the render page needs (a `name` and
//! at least one node). Invalid documents are surfaced, never rendered;
//! a broken file must not poison the batch.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::state::JOB_FILE_NAME;

/// Minimal structural shape a renderable document must have.
#[derive(Debug, Deserialize)]
struct DocumentShape {
    name: String,
    nodes: Vec<serde_json::Value>,
}

/// One discovered file, valid or not.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub path: PathBuf,
    /// Workflow name from the document, or the file stem when invalid.
    pub name: String,
    pub valid: bool,
    pub error: Option<String>,
    /// Parsed document, present only when valid.
    pub payload: Option<serde_json::Value>,
}

impl DocumentFile {
    /// Filesystem-safe name derived from the file stem: everything outside
    /// `[A-Za-z0-9_-]` becomes `_`, runs of `_` collapse.
    pub fn safe_filename(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());

        let mut safe = String::with_capacity(stem.len());
        let mut last_was_underscore = false;
        for c in stem.chars() {
            let mapped = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            };
            if mapped == '_' {
                if !last_was_underscore {
                    safe.push('_');
                }
                last_was_underscore = true;
            } else {
                safe.push(mapped);
                last_was_underscore = false;
            }
        }
        safe.trim_matches('_').to_string()
    }
}

/// Scan statistics for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
}

pub fn summarize(documents: &[DocumentFile]) -> ScanSummary {
    let valid = documents.iter().filter(|d| d.valid).count();
    ScanSummary {
        total_files: documents.len(),
        valid,
        invalid: documents.len() - valid,
    }
}

/// Discover and validate workflow documents under `root`.
///
/// Results are sorted by path so batches are deterministic. The job report
/// file is never treated as a document.
pub fn scan_documents(root: &Path, recursive: bool) -> Result<Vec<DocumentFile>> {
    if !root.is_dir() {
        return Err(Error::Scan(format!(
            "input folder not found or not a directory: {}",
            root.display()
        )));
    }

    let mut files = collect_json_files(root, recursive)?;
    files.sort();

    tracing::info!(root = %root.display(), found = files.len(), "scanned for documents");

    let documents: Vec<DocumentFile> = files.iter().map(|path| load_document(path)).collect();
    let summary = summarize(&documents);
    tracing::info!(
        valid = summary.valid,
        invalid = summary.invalid,
        "validated documents"
    );

    Ok(documents)
}

/// Read and validate a single document file.
pub fn load_document(path: &Path) -> DocumentFile {
    let fallback_name = || {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let invalid = |error: String| DocumentFile {
        path: path.to_path_buf(),
        name: fallback_name(),
        valid: false,
        error: Some(error),
        payload: None,
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => return invalid(format!("read error: {e}")),
    };

    let payload: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => return invalid(format!("invalid JSON: {e}")),
    };

    let shape: DocumentShape = match serde_json::from_value(payload.clone()) {
        Ok(shape) => shape,
        Err(e) => return invalid(format!("invalid workflow structure: {e}")),
    };
    if shape.nodes.is_empty() {
        return invalid("invalid workflow structure: nodes must not be empty".to_string());
    }

    DocumentFile {
        path: path.to_path_buf(),
        name: shape.name,
        valid: true,
        error: None,
        payload: Some(payload),
    }
}

fn collect_json_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = entry.map_err(|e| Error::Scan(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let is_job_file = path
            .file_name()
            .is_some_and(|name| name == JOB_FILE_NAME);

        if is_json && !is_job_file {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Repair near-valid documents in place by adding a missing `name` field
/// (derived from the file stem). Only documents that would otherwise pass
/// validation are touched; broken JSON and empty `nodes` stay as they are.
/// Returns the rewritten paths.
pub fn repair_missing_names(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let documents = scan_documents(root, recursive)?;

    let mut repaired = Vec::new();
    for doc in documents.iter().filter(|d| !d.valid) {
        if add_name_from_stem(&doc.path)? {
            repaired.push(doc.path.clone());
        }
    }

    tracing::info!(repaired = repaired.len(), "repair pass finished");
    Ok(repaired)
}

fn add_name_from_stem(path: &Path) -> Result<bool> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Ok(false);
    };
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return Ok(false);
    };
    let Some(object) = value.as_object_mut() else {
        return Ok(false);
    };

    let renderable = object
        .get("nodes")
        .and_then(|n| n.as_array())
        .is_some_and(|nodes| !nodes.is_empty());
    let named = object.get("name").is_some_and(|n| n.is_string());
    if !renderable || named {
        return Ok(false);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    object.insert("name".to_string(), serde_json::Value::String(stem));

    // Same all-or-nothing write as the job report: the user's document must
    // never be left half-rewritten.
    let body = serde_json::to_vec_pretty(&value)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&body)?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!(file = %path.display(), "added missing name");
    Ok(true)
}
