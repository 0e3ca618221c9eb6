//! Progress reporting for queue runs.
//!
//! The queue notifies a [`ProgressSink`] whenever the total item count
//! changes or an item finishes, and once at the end of a successful run.
//! Sinks render that however they like; this crate ships a console
//! counter, a tracing-based sink, and a no-op sink.

#![warn(missing_docs)]

pub mod console;
pub mod sink;

pub use console::ConsoleProgress;
pub use sink::{LogProgress, NullProgress, ProgressSink};
