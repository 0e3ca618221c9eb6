//! The progress sink trait and basic implementations.

use tracing::info;

/// Receiver of coarse-grained progress notifications from a queue.
///
/// `update` fires on every total-count change (an item was enqueued,
/// `label` is `None`) and on every item that finishes running (`label`
/// carries the item name). `end` fires once when a run drains without
/// failure. Implementations must not fail; anything that can go wrong
/// while rendering has to be swallowed or logged by the sink itself.
pub trait ProgressSink: Send + Sync {
    /// Report `finished` out of `total` items, optionally naming the item
    /// that just finished.
    fn update(&self, finished: usize, total: usize, label: Option<&str>);

    /// Report that the run drained successfully.
    fn end(&self);
}

/// A sink that discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _finished: usize, _total: usize, _label: Option<&str>) {}

    fn end(&self) {}
}

/// A sink that emits progress as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, finished: usize, total: usize, label: Option<&str>) {
        match label {
            Some(label) => info!(finished, total, item = %label, "work item finished"),
            None => info!(finished, total, "queue grew"),
        }
    }

    fn end(&self) {
        info!("all work items finished");
    }
}
