//! ProgressSink port - 進捗イベントの記録先
//!
//! リスナーは純粋な消費者。emit からスケジューラへ影響を返す手段はない。

use crate::domain::ProgressEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Discards every event. The default when no listener is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: &ProgressEvent) {}
}
