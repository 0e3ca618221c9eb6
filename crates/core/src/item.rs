//! The unit-of-work abstraction.

use async_trait::async_trait;

use crate::QueueError;

/// A named unit of work with prerequisites.
///
/// Each item carries a name that is unique across the queue it runs in,
/// a list of requirement names, and an action. The queue guarantees that
/// `run` is invoked only after every name in [`requirements`](Work::requirements)
/// has completed successfully; it makes no other claim about shared state
/// touched by the action. Items that contend on a shared resource must
/// express that contention as a requirement edge.
#[async_trait]
pub trait Work: Send {
    /// Name of this item, unique among all items ever enqueued in one queue.
    ///
    /// Other items reference this string in their requirement lists.
    fn name(&self) -> &str;

    /// Names of items that must complete successfully before this one starts.
    fn requirements(&self) -> &[String];

    /// Perform the work.
    ///
    /// The `queue` capability allows the action to enqueue items it
    /// discovers while running; they are considered for dispatch in the
    /// same flush. Failure is reported by returning `Err`, which stops
    /// any further dispatch in the owning queue.
    async fn run(&mut self, queue: &dyn Enqueue) -> Result<(), anyhow::Error>;
}

/// Capability to add work to a running queue.
///
/// Implemented by the queue's handle and passed into [`Work::run`] so that
/// items can register dependencies they only discover mid-run.
pub trait Enqueue: Send + Sync {
    /// Add an item to the queue.
    ///
    /// Safe to call at any time, including from inside another item's
    /// `run`. Rejects items whose name was already enqueued.
    fn enqueue(&self, item: Box<dyn Work>) -> Result<(), QueueError>;
}
