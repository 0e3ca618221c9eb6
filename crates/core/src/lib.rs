//! depq core data model.
//!
//! This crate defines the unit-of-work abstraction shared by the rest of
//! the workspace: the [`Work`] trait, the [`Enqueue`] capability handed to
//! running items, and the error taxonomy for a queue run.

#![warn(missing_docs)]

mod error;
mod item;

pub use error::{ItemFailure, QueueError, UnmetRequirement};
pub use item::{Enqueue, Work};
