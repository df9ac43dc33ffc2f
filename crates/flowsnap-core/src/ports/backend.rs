//! Render backend port.
//!
//! The backend is the boundary to the external browser-automation engine.
//! It contracts exactly one attempt: navigate, wait, capture, write the file.
//! Any error it returns is transient at this level; the resilient adapter
//! decides whether to retry.

use async_trait::async_trait;

use crate::domain::RenderTask;
use crate::error::Result;

#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// One render attempt. On success the PNG exists at the task's
    /// `output_path` (overwriting any previous file).
    async fn render(&self, task: &RenderTask) -> Result<()>;
}

/// Creates one isolated backend instance per execution context.
///
/// Sequential mode calls this once; a pool calls it once per worker so a
/// crash or hang in one browser session cannot block another worker's
/// in-flight render. Errors from `create` are infrastructure failures
/// ([`Error::BackendStartup`](crate::Error::BackendStartup)).
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(&self, worker_id: usize) -> Result<Box<dyn RenderBackend>>;
}
