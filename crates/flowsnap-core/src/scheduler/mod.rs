//! Task dispatch.
//!
//! The dispatcher owns the lifecycle of one batch: hand every task to an
//! execution mode, collect exactly one result per task, and narrate progress
//! through the [`ProgressSink`]. Two modes exist:
//!
//! - sequential (`workers == 1`): one backend, tasks in order, no pool
//!   machinery at all;
//! - pool (`workers > 1`): fixed worker set, static round-robin assignment,
//!   results harvested by polling [`Pending`](crate::ports::Pending) handles.
//!
//! # 設計メモ
//!
//! プールの結果回収はポーリング方式。完了通知を push にすると sink と
//! 回収の順序が絡んで複雑になるため、dispatcher が自分のペースで
//! Pending を舐める。1 周で何も進まなければ poll_interval だけ眠る。

mod pool;
mod sequential;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::{ProgressEvent, RenderTask, TaskResult};
use crate::error::Result;
use crate::ports::{BackendFactory, Clock, NoopSink, ProgressSink, SystemClock};
use crate::retry::RetryPolicy;

/// Graceful-stop signal pair. Flip the sender to `true` to request shutdown.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub struct Dispatcher {
    workers: usize,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ProgressSink>,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(workers: usize, policy: RetryPolicy) -> Self {
        Self {
            workers: workers.max(1),
            policy,
            clock: Arc::new(SystemClock),
            sink: Arc::new(NoopSink),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run one batch to completion.
    ///
    /// Returns one result per task, in task order for sequential mode and in
    /// completion order for the pool. Per-task failures are results, never
    /// errors; `Err` means the batch itself could not proceed (backend
    /// startup in sequential mode, or an external stop request).
    pub async fn run(
        &self,
        tasks: Vec<RenderTask>,
        factory: Arc<dyn BackendFactory>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<TaskResult>> {
        self.sink.emit(&ProgressEvent::BatchStarted {
            total: tasks.len(),
            workers: self.workers,
        });
        tracing::info!(total = tasks.len(), workers = self.workers, "batch started");

        let results = if tasks.is_empty() {
            Vec::new()
        } else if self.workers == 1 {
            sequential::run(
                tasks,
                Arc::clone(&factory),
                self.policy.clone(),
                Arc::clone(&self.clock),
                Arc::clone(&self.sink),
                shutdown,
            )
            .await?
        } else {
            pool::run(
                tasks,
                self.workers,
                Arc::clone(&factory),
                self.policy.clone(),
                Arc::clone(&self.clock),
                Arc::clone(&self.sink),
                self.poll_interval,
                shutdown,
            )
            .await?
        };

        let successful = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - successful;
        self.sink
            .emit(&ProgressEvent::BatchFinished { successful, failed });
        tracing::info!(successful, failed, "batch finished");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use rstest::rstest;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::Error;
    use crate::ports::progress::testing::RecordingSink;
    use crate::ports::{FixedClock, RenderBackend};

    /// Succeeds or fails per source identity; never touches the filesystem.
    struct StubBackend {
        fail_sources: HashSet<String>,
        panic_sources: HashSet<String>,
    }

    #[async_trait]
    impl RenderBackend for StubBackend {
        async fn render(&self, task: &RenderTask) -> Result<()> {
            if self.panic_sources.contains(task.source_identity()) {
                panic!("stub backend panic for {}", task.source_identity());
            }
            if self.fail_sources.contains(task.source_identity()) {
                return Err(Error::Render("stub render failure".to_string()));
            }
            Ok(())
        }
    }

    /// Hands out stub backends; optionally refuses startup for one worker.
    #[derive(Default)]
    struct StubFactory {
        fail_worker: Option<usize>,
        fail_sources: HashSet<String>,
        panic_sources: HashSet<String>,
    }

    #[async_trait]
    impl BackendFactory for StubFactory {
        async fn create(&self, worker_id: usize) -> Result<Box<dyn RenderBackend>> {
            if self.fail_worker == Some(worker_id) {
                return Err(Error::BackendStartup(format!(
                    "no browser for worker {worker_id}"
                )));
            }
            Ok(Box::new(StubBackend {
                fail_sources: self.fail_sources.clone(),
                panic_sources: self.panic_sources.clone(),
            }))
        }
    }

    fn tasks(n: usize) -> Vec<RenderTask> {
        (0..n)
            .map(|i| {
                RenderTask::new(
                    serde_json::json!({}),
                    format!("task-{i}"),
                    format!("task-{i}.json"),
                    format!("task-{i}.png"),
                )
            })
            .collect()
    }

    fn dispatcher(workers: usize) -> Dispatcher {
        Dispatcher::new(workers, RetryPolicy::new(3, Duration::ZERO))
            .with_poll_interval(Duration::from_millis(1))
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::small_pool(2)]
    #[case::wide_pool(4)]
    #[tokio::test]
    async fn every_task_yields_exactly_one_result(#[case] workers: usize) {
        let (_stop, shutdown) = shutdown_channel();
        let results = dispatcher(workers)
            .run(tasks(7), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap();

        assert_eq!(results.len(), 7);
        let identities: HashSet<_> = results.iter().map(|r| r.source_identity.clone()).collect();
        assert_eq!(identities.len(), 7, "duplicate result for some task");
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::pool(3)]
    #[tokio::test]
    async fn per_task_failures_stay_results(#[case] workers: usize) {
        let factory = StubFactory {
            fail_sources: HashSet::from(["task-1.json".to_string()]),
            ..StubFactory::default()
        };
        let (_stop, shutdown) = shutdown_channel();

        let results = dispatcher(workers)
            .run(tasks(3), Arc::new(factory), shutdown)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source_identity, "task-1.json");
    }

    #[tokio::test]
    async fn sequential_reports_tasks_in_order() {
        let (_stop, shutdown) = shutdown_channel();
        let results = dispatcher(1)
            .run(tasks(4), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap();

        let order: Vec<_> = results.iter().map(|r| r.source_identity.as_str()).collect();
        assert_eq!(order, vec!["task-0.json", "task-1.json", "task-2.json", "task-3.json"]);
    }

    #[tokio::test]
    async fn sequential_startup_failure_is_fatal() {
        let factory = StubFactory {
            fail_worker: Some(0),
            ..StubFactory::default()
        };
        let (_stop, shutdown) = shutdown_channel();

        let err = dispatcher(1)
            .run(tasks(2), Arc::new(factory), shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendStartup(_)));
    }

    #[tokio::test]
    async fn pool_startup_failure_is_contained_to_one_worker() {
        let factory = StubFactory {
            fail_worker: Some(1),
            ..StubFactory::default()
        };
        let (_stop, shutdown) = shutdown_channel();

        // Round-robin over two workers: even tasks on worker 0, odd on 1.
        let results = dispatcher(2)
            .run(tasks(4), Arc::new(factory), shutdown)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        for result in &results {
            let odd = result
                .source_identity
                .strip_prefix("task-")
                .and_then(|s| s.strip_suffix(".json"))
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap()
                % 2
                == 1;
            if odd {
                assert!(!result.is_success());
                let reason = result.outcome.reason().unwrap();
                assert!(reason.contains("backend startup failed"), "reason: {reason}");
            } else {
                assert!(result.is_success(), "worker 0 task must be unaffected");
            }
        }
    }

    #[tokio::test]
    async fn dead_worker_never_loses_results() {
        // A panicking render kills its worker task; the tasks queued behind
        // it must still come back, as synthesized failures.
        let factory = StubFactory {
            panic_sources: HashSet::from(["task-0.json".to_string()]),
            ..StubFactory::default()
        };
        let (_stop, shutdown) = shutdown_channel();

        let results = dispatcher(2)
            .run(tasks(4), Arc::new(factory), shutdown)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        for result in results.iter().filter(|r| !r.is_success()) {
            assert!(result.source_identity.ends_with("0.json") || result.source_identity.ends_with("2.json"));
        }
        assert_eq!(results.iter().filter(|r| !r.is_success()).count(), 2);
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::pool(2)]
    #[tokio::test]
    async fn shutdown_request_interrupts_the_batch(#[case] workers: usize) {
        let (stop, shutdown) = shutdown_channel();
        stop.send(true).unwrap();

        let err = dispatcher(workers)
            .run(tasks(3), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted));
    }

    #[rstest]
    #[case::sequential(1)]
    #[case::pool(2)]
    #[tokio::test]
    async fn results_are_stamped_by_the_injected_clock(#[case] workers: usize) {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let (_stop, shutdown) = shutdown_channel();

        let results = dispatcher(workers)
            .with_clock(Arc::new(FixedClock::new(at)))
            .run(tasks(3), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.timestamp == at));
    }

    #[tokio::test]
    async fn progress_events_bracket_the_batch() {
        let sink = Arc::new(RecordingSink::default());
        let (_stop, shutdown) = shutdown_channel();

        dispatcher(2)
            .with_sink(Arc::clone(&sink) as Arc<dyn ProgressSink>)
            .run(tasks(3), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap();

        let events = sink.take();
        assert!(matches!(
            events.first(),
            Some(ProgressEvent::BatchStarted { total: 3, workers: 2 })
        ));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::BatchFinished { successful: 3, failed: 0 })
        ));

        let started = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::TaskStarted { .. }))
            .count();
        let completed = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::TaskCompleted { .. }))
            .count();
        assert_eq!(started, 3);
        assert_eq!(completed, 3);
    }

    #[tokio::test]
    async fn empty_batch_finishes_immediately() {
        let sink = Arc::new(RecordingSink::default());
        let (_stop, shutdown) = shutdown_channel();

        let results = dispatcher(4)
            .with_sink(Arc::clone(&sink) as Arc<dyn ProgressSink>)
            .run(Vec::new(), Arc::new(StubFactory::default()), shutdown)
            .await
            .unwrap();

        assert!(results.is_empty());
        let events = sink.take();
        assert_eq!(events.len(), 2);
    }
}
