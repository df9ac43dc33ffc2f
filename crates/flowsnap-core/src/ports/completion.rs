//! Completion contract: a minimal promise/future pair the dispatcher can
//! poll without knowing anything about the pool mechanism behind it.
//!
//! - Worker side holds the [`Completer`] and fulfills it exactly once.
//! - Dispatcher side holds the [`Pending`] and polls it non-blockingly.
//! - A dropped `Completer` (worker died before reporting) is observable as
//!   [`PollOutcome::Abandoned`], so the dispatcher can synthesize a failure
//!   instead of waiting forever — no task result is ever silently dropped.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Create a linked promise pair.
pub fn completion<T>() -> (Completer<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Pending { rx })
}

/// Fulfilling side. Consumed on completion.
pub struct Completer<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the value. If the dispatcher already gave up on this handle
    /// the value is discarded, which is fine: nobody is listening.
    pub fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// Result of one non-blocking poll.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    NotReady,
    /// The completer was dropped without fulfilling the promise.
    Abandoned,
}

/// Polling side.
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// Non-blocking check. After `Ready` has been returned once, subsequent
    /// polls report `Abandoned`; callers stop polling consumed handles.
    pub fn poll_once(&mut self) -> PollOutcome<T> {
        match self.rx.try_recv() {
            Ok(value) => PollOutcome::Ready(value),
            Err(TryRecvError::Empty) => PollOutcome::NotReady,
            Err(TryRecvError::Closed) => PollOutcome::Abandoned,
        }
    }
}
