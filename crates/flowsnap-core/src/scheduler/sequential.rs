//! Sequential execution: one backend, tasks in order.
//!
//! No pool machinery. A backend that cannot start is fatal here: with a
//! single execution context there is nothing to fall back to.

use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::ResilientRenderer;
use crate::domain::{ProgressEvent, RenderTask, TaskResult};
use crate::error::{Error, Result};
use crate::ports::{BackendFactory, Clock, ProgressSink};
use crate::retry::RetryPolicy;

pub(super) async fn run(
    tasks: Vec<RenderTask>,
    factory: Arc<dyn BackendFactory>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ProgressSink>,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<TaskResult>> {
    let backend = factory.create(0).await?;
    let renderer = ResilientRenderer::new(backend, policy, 0, clock);

    let mut results = Vec::with_capacity(tasks.len());
    for task in &tasks {
        // Stop requests take effect between tasks; an in-flight render is
        // allowed to finish so its output file is never half-written.
        if *shutdown.borrow() {
            tracing::info!(
                completed = results.len(),
                remaining = tasks.len() - results.len(),
                "stop requested"
            );
            return Err(Error::Interrupted);
        }

        sink.emit(&ProgressEvent::TaskStarted {
            worker_id: 0,
            display_name: task.display_name().to_string(),
        });

        let result = renderer.render_task(task).await;
        sink.emit(&ProgressEvent::TaskCompleted {
            worker_id: 0,
            result: result.clone(),
        });
        results.push(result);
    }

    Ok(results)
}
