//! Error taxonomy for a queue run.

use thiserror::Error;

/// A captured failure from one work item.
///
/// Stored by the queue while other items drain, then surfaced through
/// [`QueueError::ItemFailed`].
#[derive(Debug)]
pub struct ItemFailure {
    /// Name of the item that failed.
    pub name: String,
    /// The error its action returned.
    pub error: anyhow::Error,
}

impl ItemFailure {
    /// Convert into the error surfaced by `flush`.
    pub fn into_error(self) -> QueueError {
        QueueError::ItemFailed {
            name: self.name,
            error: self.error,
        }
    }
}

/// A work item whose requirements can never be met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetRequirement {
    /// Name of the stuck item.
    pub name: String,
    /// Its requirements that never completed.
    pub missing: Vec<String>,
}

impl std::fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (missing: {})", self.name, self.missing.join(", "))
    }
}

/// Errors produced by the execution queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// An item with this name was already enqueued.
    #[error("duplicate work item name `{0}`")]
    DuplicateName(String),

    /// A work item's action returned an error.
    #[error("work item `{name}` failed: {error:#}")]
    ItemFailed {
        /// Name of the failed item.
        name: String,
        /// The original error raised by the item's action.
        error: anyhow::Error,
    },

    /// The queue stalled: items remain but none can ever become ready.
    #[error("unsatisfiable requirements: {}", .stuck.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Unsatisfiable {
        /// The stuck items and the requirements they are waiting on.
        stuck: Vec<UnmetRequirement>,
    },

    /// The run was cancelled before all items were dispatched.
    #[error("queue run cancelled")]
    Cancelled,
}
