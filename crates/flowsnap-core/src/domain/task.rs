//! The unit of work: one document to render into one image.

use std::path::{Path, PathBuf};

/// One document-to-image rendering unit of work.
///
/// Immutable once created; fields are private so nothing downstream can
/// mutate a task after it has been scheduled. `source_identity` is the stable
/// key (path relative to the input root) used for resumability and for
/// matching results back to tasks.
#[derive(Debug, Clone)]
pub struct RenderTask {
    payload: serde_json::Value,
    display_name: String,
    source_identity: String,
    output_path: PathBuf,
}

impl RenderTask {
    pub fn new(
        payload: serde_json::Value,
        display_name: impl Into<String>,
        source_identity: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            payload,
            display_name: display_name.into(),
            source_identity: source_identity.into(),
            output_path: output_path.into(),
        }
    }

    /// The opaque workflow document handed to the render backend.
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Human-readable name for progress reporting.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Stable key identifying the document across runs.
    pub fn source_identity(&self) -> &str {
        &self.source_identity
    }

    /// Where the PNG must land.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
