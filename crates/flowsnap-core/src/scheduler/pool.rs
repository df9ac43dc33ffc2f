//! Pool execution: fixed worker set, static round-robin assignment.
//!
//! Task `i` goes to worker `i % workers`, decided up front. Each worker owns
//! its own backend instance, so a wedged browser session only ever stalls the
//! tasks assigned to that worker. The dispatcher collects results by polling
//! the [`Pending`] handle of every outstanding task; a handle whose worker
//! died without reporting shows up as abandoned and is converted into a
//! failure result on the spot.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::backend::ResilientRenderer;
use crate::domain::{ProgressEvent, RenderTask, TaskResult};
use crate::error::{Error, Result};
use crate::ports::{completion, BackendFactory, Clock, Completer, Pending, PollOutcome, ProgressSink};
use crate::retry::RetryPolicy;

struct Slot {
    worker_id: usize,
    task: RenderTask,
    pending: Pending<TaskResult>,
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn run(
    tasks: Vec<RenderTask>,
    workers: usize,
    factory: Arc<dyn BackendFactory>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ProgressSink>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Vec<TaskResult>> {
    let total = tasks.len();

    let mut queues: Vec<VecDeque<(RenderTask, Completer<TaskResult>)>> =
        (0..workers).map(|_| VecDeque::new()).collect();
    let mut slots: Vec<Option<Slot>> = Vec::with_capacity(total);

    for (i, task) in tasks.into_iter().enumerate() {
        let worker_id = i % workers;
        let (completer, pending) = completion();
        slots.push(Some(Slot {
            worker_id,
            task: task.clone(),
            pending,
        }));
        queues[worker_id].push_back((task, completer));
    }

    let handles: Vec<_> = queues
        .into_iter()
        .enumerate()
        .map(|(worker_id, queue)| {
            tokio::spawn(worker_loop(
                worker_id,
                queue,
                Arc::clone(&factory),
                policy.clone(),
                Arc::clone(&clock),
                Arc::clone(&sink),
                shutdown.clone(),
            ))
        })
        .collect();

    let mut results = Vec::with_capacity(total);
    while results.len() < total {
        if *shutdown.borrow() {
            for handle in &handles {
                handle.abort();
            }
            tracing::info!(
                completed = results.len(),
                remaining = total - results.len(),
                "stop requested"
            );
            return Err(Error::Interrupted);
        }

        let mut progressed = false;
        for slot in slots.iter_mut() {
            let Some(active) = slot.as_mut() else { continue };

            let result = match active.pending.poll_once() {
                PollOutcome::Ready(result) => result,
                PollOutcome::NotReady => continue,
                PollOutcome::Abandoned => {
                    tracing::error!(
                        worker_id = active.worker_id,
                        task = active.task.display_name(),
                        "worker died without reporting, recording failure"
                    );
                    TaskResult::failure(
                        &active.task,
                        "worker terminated before reporting a result",
                        active.worker_id,
                        clock.now(),
                    )
                }
            };

            sink.emit(&ProgressEvent::TaskCompleted {
                worker_id: result.worker_id,
                result: result.clone(),
            });
            results.push(result);
            *slot = None;
            progressed = true;
        }

        if !progressed && results.len() < total {
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    for handle in handles {
        let _ = handle.await;
    }
    Ok(results)
}

async fn worker_loop(
    worker_id: usize,
    mut queue: VecDeque<(RenderTask, Completer<TaskResult>)>,
    factory: Arc<dyn BackendFactory>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ProgressSink>,
    shutdown: watch::Receiver<bool>,
) {
    let backend = match factory.create(worker_id).await {
        Ok(backend) => backend,
        Err(e) => {
            // Startup failure is scoped to this worker: its assignments are
            // reported failed, everyone else keeps rendering.
            tracing::error!(worker_id, error = %e, "backend startup failed");
            for (task, completer) in queue {
                completer.complete(TaskResult::failure(
                    &task,
                    format!("backend startup failed: {e}"),
                    worker_id,
                    clock.now(),
                ));
            }
            return;
        }
    };

    let renderer = ResilientRenderer::new(backend, policy, worker_id, clock);
    while let Some((task, completer)) = queue.pop_front() {
        if *shutdown.borrow() {
            return;
        }

        sink.emit(&ProgressEvent::TaskStarted {
            worker_id,
            display_name: task.display_name().to_string(),
        });
        completer.complete(renderer.render_task(&task).await);
    }
    tracing::debug!(worker_id, "worker queue drained");
}
