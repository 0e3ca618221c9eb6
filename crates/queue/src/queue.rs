//! The execution queue and its worker pool.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use depq_core::{Enqueue, QueueError, Work};
use depq_progress::ProgressSink;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::QueueState;

/// How long the flush loop waits for a notification before re-checking.
///
/// The wait is bounded so a cancellation arriving while nothing is
/// completing still gets acted on promptly.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Monitor shared between the flush loop, workers, and handles.
struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Shared {
    /// Enqueue one item and wake the flush loop.
    fn enqueue(&self, item: Box<dyn Work>) -> Result<(), QueueError> {
        let name = item.name().to_string();
        let (finished, total) = {
            let mut state = self.state.lock().unwrap();
            state.admit(item)?;
            (state.finished(), state.total())
        };
        debug!(item = %name, total, "enqueued");
        if let Some(progress) = &self.progress {
            progress.update(finished, total, None);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Record a cancellation and discard everything not yet dispatched.
    fn cancel(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.set_cancelled();
            state.abort_pending();
        }
        warn!("queue run cancelled");
        self.notify.notify_one();
    }

    /// Record one finished item and wake the flush loop.
    fn record_outcome(&self, name: String, result: Result<(), anyhow::Error>) {
        let (finished, total) = {
            let mut state = self.state.lock().unwrap();
            match result {
                Ok(()) => state.record_success(&name),
                Err(error) => {
                    warn!(item = %name, error = %format!("{error:#}"), "work item failed");
                    state.record_failure(name.clone(), error);
                }
            }
            (state.finished(), state.total())
        };
        if let Some(progress) = &self.progress {
            progress.update(finished, total, Some(&name));
        }
        self.notify.notify_one();
    }
}

/// Cloneable handle for enqueuing into (or cancelling) a queue.
///
/// This is what a running item receives as its [`Enqueue`] capability,
/// and what callers keep around to feed a queue from outside `flush`.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl QueueHandle {
    /// Cancel the run: nothing new is dispatched, in-flight items drain,
    /// and `flush` surfaces [`QueueError::Cancelled`].
    pub fn cancel(&self) {
        self.shared.cancel();
    }
}

impl Enqueue for QueueHandle {
    fn enqueue(&self, item: Box<dyn Work>) -> Result<(), QueueError> {
        self.shared.enqueue(item)
    }
}

/// Runs interdependent work items with bounded parallelism.
///
/// Items are dispatched in enqueue order among those whose requirements
/// are all completed; a later-enqueued ready item starts before an
/// earlier-enqueued item that is still waiting. On the first failure no
/// further item starts, items already running finish and are reaped, and
/// [`flush`](Self::flush) returns that first failure.
pub struct ExecutionQueue {
    shared: Arc<Shared>,
    jobs: usize,
    poll_interval: Duration,
}

impl ExecutionQueue {
    /// Create a queue running at most `jobs` items concurrently.
    ///
    /// `jobs` is clamped to at least 1. With `jobs == 1` items execute
    /// inline in the task calling `flush`, with no worker indirection.
    pub fn new(jobs: usize, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        if jobs == 0 {
            warn!("jobs must be at least 1, clamping");
        }
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::new()),
                notify: Notify::new(),
                progress,
            }),
            jobs: jobs.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how long the flush loop waits between re-checks.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// A cloneable handle usable from outside or inside a run.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            shared: self.shared.clone(),
        }
    }

    /// Add an item to be executed once its requirements are satisfied.
    pub fn enqueue(&self, item: Box<dyn Work>) -> Result<(), QueueError> {
        self.shared.enqueue(item)
    }

    /// Cancel the run. Equivalent to [`QueueHandle::cancel`].
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Names of items that completed successfully so far, sorted.
    pub fn completed(&self) -> Vec<String> {
        self.shared.state.lock().unwrap().completed()
    }

    /// Names of items discarded without running (abort or cancel).
    pub fn discarded(&self) -> Vec<String> {
        self.shared.state.lock().unwrap().discarded()
    }

    /// Run every enqueued item (including ones added during the run) to
    /// completion, or to the first failure.
    ///
    /// Returns the first captured failure if any item failed,
    /// [`QueueError::Cancelled`] if the run was cancelled, or
    /// [`QueueError::Unsatisfiable`] if items remain that can never
    /// become ready (a cycle or a requirement nothing provides).
    pub async fn flush(&mut self) -> Result<(), QueueError> {
        let result = if self.jobs == 1 {
            self.flush_serial().await
        } else {
            self.flush_parallel().await
        };
        if result.is_ok() {
            if let Some(progress) = &self.shared.progress {
                progress.end();
            }
        }
        result
    }

    /// Single-threaded fast path: run each ready item inline.
    ///
    /// An item error propagates out immediately instead of going through
    /// the capture-and-drain protocol of the parallel path.
    async fn flush_serial(&mut self) -> Result<(), QueueError> {
        loop {
            let next = {
                let mut state = self.shared.state.lock().unwrap();
                if state.has_failures() || state.is_cancelled() {
                    state.abort_pending();
                }
                if state.is_drained() {
                    break;
                }
                if state.is_stalled() {
                    return Err(QueueError::Unsatisfiable {
                        stuck: state.unmet(),
                    });
                }
                match state.next_ready() {
                    Some(item) => {
                        state.mark_running(item.name());
                        item
                    }
                    // Nothing dispatchable this pass; the next pass
                    // re-runs the abort and stall checks.
                    None => continue,
                }
            };
            let mut item = next;
            let name = item.name().to_string();
            debug!(item = %name, "running inline");
            let handle = self.handle();
            let result = item.run(&handle).await;
            let (finished, total) = {
                let mut state = self.shared.state.lock().unwrap();
                match result {
                    Ok(()) => state.record_success(&name),
                    Err(error) => {
                        state.clear_running(&name);
                        return Err(QueueError::ItemFailed { name, error });
                    }
                }
                (state.finished(), state.total())
            };
            if let Some(progress) = &self.shared.progress {
                progress.update(finished, total, Some(&name));
            }
        }
        let state = self.shared.state.lock().unwrap();
        debug_assert_eq!(state.running_len(), 0);
        if state.is_cancelled() {
            return Err(QueueError::Cancelled);
        }
        Ok(())
    }

    /// Parallel path: a fixed pool of `jobs` workers fed over a channel.
    async fn flush_parallel(&mut self) -> Result<(), QueueError> {
        let (tx, rx) = mpsc::channel::<Box<dyn Work>>(self.jobs);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let workers: Vec<JoinHandle<()>> = (0..self.jobs)
            .map(|worker| {
                let rx = rx.clone();
                let shared = self.shared.clone();
                tokio::spawn(worker_loop(worker, rx, shared))
            })
            .collect();

        let drained = self.drive(&tx).await;

        // Close the feed so idle workers exit, then wait for the pool.
        drop(tx);
        for worker in workers {
            let _ = worker.await;
        }

        let mut state = self.shared.state.lock().unwrap();
        debug_assert_eq!(state.running_len(), 0);
        drained?;
        if let Some(first) = state.take_first_failure() {
            return Err(first.into_error());
        }
        if state.is_cancelled() {
            return Err(QueueError::Cancelled);
        }
        Ok(())
    }

    /// The scheduling loop: reap (via worker records), abort-check,
    /// dispatch, then wait for something to happen.
    async fn drive(&self, tx: &mpsc::Sender<Box<dyn Work>>) -> Result<(), QueueError> {
        loop {
            let batch = {
                let mut state = self.shared.state.lock().unwrap();
                if state.has_failures() || state.is_cancelled() {
                    state.abort_pending();
                }
                if state.is_drained() {
                    return Ok(());
                }
                if state.is_stalled() {
                    return Err(QueueError::Unsatisfiable {
                        stuck: state.unmet(),
                    });
                }
                let mut batch = Vec::new();
                while state.running_len() < self.jobs {
                    match state.next_ready() {
                        Some(item) => {
                            state.mark_running(item.name());
                            batch.push(item);
                        }
                        None => break,
                    }
                }
                batch
            };
            for item in batch {
                debug!(item = %item.name(), "dispatching");
                // Capacity is `jobs` and dispatch is bounded by the
                // running set, so this never waits on a full channel.
                if tx.send(item).await.is_err() {
                    break;
                }
            }
            // Woken by enqueue, completion, or cancel; the timeout keeps
            // the loop responsive if a notification is ever missed.
            let _ = tokio::time::timeout(self.poll_interval, self.shared.notify.notified()).await;
        }
    }
}

/// One pool worker: pull items off the feed until it closes.
async fn worker_loop(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Box<dyn Work>>>>,
    shared: Arc<Shared>,
) {
    loop {
        let item = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(mut item) = item else { break };
        let name = item.name().to_string();
        debug!(worker, item = %name, "running");
        let handle = QueueHandle {
            shared: shared.clone(),
        };
        let result = item.run(&handle).await;
        shared.record_outcome(name, result);
    }
}
