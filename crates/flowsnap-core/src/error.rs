//! Error types for the rendering pipeline.
//!
//! Taxonomy:
//! - `Render`: one failed render attempt. Transient at the attempt level; the
//!   resilient adapter retries it and eventually demotes it to a `Failure`
//!   outcome on the task's result. It never aborts a batch.
//! - `BackendStartup`: the browser session could not be created at all.
//!   Fatal for a sequential run, fatal for the affected worker in a pool.
//! - `Interrupted`: the run was cancelled from the outside (Ctrl-C).
//! - `Scan` / `Server` / `Io` / `Json`: boundary failures from the document
//!   scanner, the local page server, and the job-state store.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A single render attempt failed (retried by the adapter).
    #[error("render failed: {0}")]
    Render(String),

    /// The render backend could not be started (browser launch, etc.).
    #[error("backend startup failed: {0}")]
    BackendStartup(String),

    /// Document discovery/validation failed at the directory level.
    #[error("scan failed: {0}")]
    Scan(String),

    /// The local render-page server failed to start or bind.
    #[error("page server: {0}")]
    Server(String),

    /// The run was cancelled by an interrupt signal.
    #[error("interrupted")]
    Interrupted,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Is this an infrastructure failure (aborts a run / a worker slot)
    /// rather than a per-task failure?
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::BackendStartup(_))
    }
}
