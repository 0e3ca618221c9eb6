//! Dependency-ordered execution queue.
//!
//! [`ExecutionQueue`] runs a dynamically growing set of named work items
//! with bounded parallelism, never starting an item before every name in
//! its requirement list has completed successfully. Items may enqueue
//! further items while running, which is how lazily discovered
//! dependencies are handled.
//!
//! The queue stops dispatching on the first failure, lets in-flight items
//! drain, and surfaces that first failure from [`ExecutionQueue::flush`].
//! With `jobs == 1` there is no worker indirection at all: items run
//! inline in the flushing task and an error propagates out immediately.

#![warn(missing_docs)]

mod queue;
mod state;

pub use depq_core::{Enqueue, ItemFailure, QueueError, UnmetRequirement, Work};
pub use queue::{ExecutionQueue, QueueHandle};
