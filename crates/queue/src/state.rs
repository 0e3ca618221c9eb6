//! Mutable queue state, only ever touched behind the queue's mutex.

use std::collections::HashSet;

use depq_core::{ItemFailure, QueueError, UnmetRequirement, Work};

/// The ready/running/completed bookkeeping for one queue.
///
/// `ready` keeps insertion order; dispatch scans it linearly and removes
/// by index, so insertion order is the tie-break among simultaneously
/// ready items and nothing more.
pub(crate) struct QueueState {
    /// Items not yet dispatched, in enqueue order.
    ready: Vec<Box<dyn Work>>,
    /// Names currently executing (or handed to a worker).
    running: HashSet<String>,
    /// Names whose action returned successfully. Requirement lookup set.
    completed: HashSet<String>,
    /// Every name ever enqueued. Duplicate rejection and totals.
    names: HashSet<String>,
    /// Captured failures, in the order they were reaped.
    failures: Vec<ItemFailure>,
    /// Names dropped from `ready` without running (abort or cancel).
    discarded: Vec<String>,
    /// Set once `cancel` is called; stops all further dispatch.
    cancelled: bool,
}

impl QueueState {
    pub(crate) fn new() -> Self {
        Self {
            ready: Vec::new(),
            running: HashSet::new(),
            completed: HashSet::new(),
            names: HashSet::new(),
            failures: Vec::new(),
            discarded: Vec::new(),
            cancelled: false,
        }
    }

    /// Add an item, rejecting names that were already enqueued.
    pub(crate) fn admit(&mut self, item: Box<dyn Work>) -> Result<(), QueueError> {
        let name = item.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(QueueError::DuplicateName(name));
        }
        self.ready.push(item);
        Ok(())
    }

    /// Total number of items ever enqueued.
    pub(crate) fn total(&self) -> usize {
        self.names.len()
    }

    /// Number of items that finished running, successfully or not.
    pub(crate) fn finished(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    pub(crate) fn running_len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.ready.is_empty() && self.running.is_empty()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// An abort condition was observed: drop everything still in `ready`.
    ///
    /// The dropped names are kept so callers can tell "never started"
    /// apart from "ran and failed".
    pub(crate) fn abort_pending(&mut self) {
        for item in self.ready.drain(..) {
            self.discarded.push(item.name().to_string());
        }
    }

    pub(crate) fn set_cancelled(&mut self) {
        self.cancelled = true;
    }

    fn satisfied(&self, item: &dyn Work) -> bool {
        item.requirements()
            .iter()
            .all(|req| self.completed.contains(req))
    }

    /// Remove and return the first ready item whose requirements are all
    /// completed, or `None` if nothing is dispatchable this pass.
    pub(crate) fn next_ready(&mut self) -> Option<Box<dyn Work>> {
        let index = self
            .ready
            .iter()
            .position(|item| self.satisfied(item.as_ref()))?;
        Some(self.ready.remove(index))
    }

    /// No item is dispatchable and none ever will be: nothing is running
    /// to complete a requirement, nothing failed, and `ready` is not empty.
    pub(crate) fn is_stalled(&self) -> bool {
        !self.cancelled
            && self.failures.is_empty()
            && self.running.is_empty()
            && !self.ready.is_empty()
            && !self.ready.iter().any(|item| self.satisfied(item.as_ref()))
    }

    /// The stuck items and their not-yet-completed requirements.
    pub(crate) fn unmet(&self) -> Vec<UnmetRequirement> {
        self.ready
            .iter()
            .map(|item| UnmetRequirement {
                name: item.name().to_string(),
                missing: item
                    .requirements()
                    .iter()
                    .filter(|req| !self.completed.contains(*req))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    pub(crate) fn mark_running(&mut self, name: &str) {
        self.running.insert(name.to_string());
    }

    pub(crate) fn clear_running(&mut self, name: &str) {
        self.running.remove(name);
    }

    pub(crate) fn record_success(&mut self, name: &str) {
        self.running.remove(name);
        let inserted = self.completed.insert(name.to_string());
        debug_assert!(inserted, "item completed twice: {name}");
    }

    pub(crate) fn record_failure(&mut self, name: String, error: anyhow::Error) {
        self.running.remove(&name);
        self.failures.push(ItemFailure { name, error });
    }

    /// Surface the first captured failure, leaving any later ones behind.
    pub(crate) fn take_first_failure(&mut self) -> Option<ItemFailure> {
        if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.remove(0))
        }
    }

    pub(crate) fn completed(&self) -> Vec<String> {
        let mut names: Vec<String> = self.completed.iter().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn discarded(&self) -> Vec<String> {
        self.discarded.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use depq_core::Enqueue;

    struct StubItem {
        name: String,
        requirements: Vec<String>,
    }

    impl StubItem {
        fn boxed(name: &str, requirements: &[&str]) -> Box<dyn Work> {
            Box::new(Self {
                name: name.to_string(),
                requirements: requirements.iter().map(|r| r.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl Work for StubItem {
        fn name(&self) -> &str {
            &self.name
        }

        fn requirements(&self) -> &[String] {
            &self.requirements
        }

        async fn run(&mut self, _queue: &dyn Enqueue) -> Result<(), anyhow::Error> {
            Ok(())
        }
    }

    #[test]
    fn admit_rejects_duplicate_names() {
        let mut state = QueueState::new();
        state.admit(StubItem::boxed("a", &[])).unwrap();
        let err = state.admit(StubItem::boxed("a", &[])).unwrap_err();
        assert!(matches!(err, QueueError::DuplicateName(name) if name == "a"));
    }

    #[test]
    fn next_ready_skips_items_with_unmet_requirements() {
        let mut state = QueueState::new();
        state.admit(StubItem::boxed("b", &["a"])).unwrap();
        state.admit(StubItem::boxed("a", &[])).unwrap();

        // "b" is first in insertion order but not ready.
        let first = state.next_ready().unwrap();
        assert_eq!(first.name(), "a");
        assert!(state.next_ready().is_none());

        state.mark_running("a");
        state.record_success("a");
        let second = state.next_ready().unwrap();
        assert_eq!(second.name(), "b");
    }

    #[test]
    fn stalled_only_when_nothing_can_make_progress() {
        let mut state = QueueState::new();
        state.admit(StubItem::boxed("b", &["a"])).unwrap();
        assert!(state.is_stalled());

        // A running item may still complete "a"'s requirement chain.
        state.mark_running("x");
        assert!(!state.is_stalled());
        state.clear_running("x");

        // A recorded failure means abort, not starvation.
        state.record_failure("y".into(), anyhow::anyhow!("boom"));
        assert!(!state.is_stalled());
    }

    #[test]
    fn unmet_lists_missing_requirements_only() {
        let mut state = QueueState::new();
        state.admit(StubItem::boxed("a", &[])).unwrap();
        state.mark_running("a");
        state.record_success("a");
        state.admit(StubItem::boxed("d", &["a", "b", "c"])).unwrap();

        let unmet = state.unmet();
        assert_eq!(unmet.len(), 1);
        assert_eq!(unmet[0].name, "d");
        assert_eq!(unmet[0].missing, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn abort_pending_records_discarded_names() {
        let mut state = QueueState::new();
        state.admit(StubItem::boxed("a", &[])).unwrap();
        state.admit(StubItem::boxed("b", &["a"])).unwrap();
        state.abort_pending();
        assert!(state.is_drained());
        assert_eq!(state.discarded(), vec!["a".to_string(), "b".to_string()]);
    }
}
