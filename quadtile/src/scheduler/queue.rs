//! FIFO work queue with a wake signal.
//!
//! Workers block on a condition variable while the queue is empty and are
//! woken when the scheduler pushes new work. Queue membership is tracked in
//! a set alongside the deque so duplicate checks stay O(1) however large
//! the queue grows; both are only touched under the same lock.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::coord::QuadKey;

/// One tile to resolve: a quadkey of a registered layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// Registration index of the layer.
    pub layer: usize,
    pub key: QuadKey,
}

impl WorkItem {
    pub fn new(layer: usize, key: QuadKey) -> Self {
        Self { layer, key }
    }
}

/// What one [`WorkQueue::schedule`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Pending items dropped by a flush.
    pub flushed: usize,
    /// Items added to the queue.
    pub pushed: usize,
    /// Items skipped because they were already queued.
    pub already_queued: usize,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<WorkItem>,
    members: HashSet<WorkItem>,
    /// Items popped but not yet reported done.
    active: usize,
    shutdown: bool,
}

/// Thread-safe FIFO of [`WorkItem`]s.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    /// Signalled when work arrives or on shutdown.
    ready: Condvar,
    /// Signalled when the queue drains and no item is in progress.
    idle: Condvar,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Optionally drops all pending items, then appends `items` in order,
    /// skipping any already queued. Wakes every waiting worker if anything
    /// was pushed. Does nothing once the queue is shut down.
    pub fn schedule(&self, items: impl IntoIterator<Item = WorkItem>, flush: bool) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        let mut state = self.state.lock();
        if state.shutdown {
            return report;
        }

        if flush {
            report.flushed = state.items.len();
            state.items.clear();
            state.members.clear();
        }

        for item in items {
            if state.members.contains(&item) {
                report.already_queued += 1;
                continue;
            }
            state.members.insert(item.clone());
            state.items.push_back(item);
            report.pushed += 1;
        }

        let now_idle = state.items.is_empty() && state.active == 0;
        drop(state);

        if report.pushed > 0 {
            self.ready.notify_all();
        }
        if now_idle {
            self.idle.notify_all();
        }
        report
    }

    /// Drops all pending items. Items already being resolved are unaffected.
    pub fn flush(&self) -> usize {
        self.schedule(std::iter::empty(), true).flushed
    }

    /// Blocks until an item is available and takes it.
    ///
    /// Returns `None` once the queue has been shut down. Every item returned
    /// must be followed by a call to [`WorkQueue::task_done`].
    pub fn pop_blocking(&self) -> Option<WorkItem> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                state.members.remove(&item);
                state.active += 1;
                return Some(item);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Marks one popped item as finished.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        let now_idle = state.items.is_empty() && state.active == 0;
        drop(state);
        if now_idle {
            self.idle.notify_all();
        }
    }

    /// Waits until the queue is empty and no item is in progress.
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !(state.items.is_empty() && state.active == 0) {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return state.items.is_empty() && state.active == 0;
            }
        }
        true
    }

    /// Wakes every worker and makes [`WorkQueue::pop_blocking`] return `None`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.items.clear();
        state.members.clear();
        drop(state);
        self.ready.notify_all();
        self.idle.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.state.lock().members.contains(item)
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Number of items currently being resolved.
    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    /// Pending items in queue order.
    pub fn pending(&self) -> Vec<WorkItem> {
        self.state.lock().items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(key: &str) -> WorkItem {
        WorkItem::new(0, key.parse().unwrap())
    }

    #[test]
    fn test_fifo_order() {
        let queue = WorkQueue::new();
        queue.schedule(vec![item("0"), item("1"), item("2")], false);

        assert_eq!(queue.pop_blocking(), Some(item("0")));
        assert_eq!(queue.pop_blocking(), Some(item("1")));
        assert_eq!(queue.pop_blocking(), Some(item("2")));
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let queue = WorkQueue::new();
        queue.schedule(vec![item("0"), item("1")], false);
        let report = queue.schedule(vec![item("1"), item("2")], false);

        assert_eq!(report.pushed, 1);
        assert_eq!(report.already_queued, 1);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_same_key_on_other_layer_is_distinct() {
        let queue = WorkQueue::new();
        let report = queue.schedule(
            vec![item("0"), WorkItem::new(1, "0".parse().unwrap())],
            false,
        );
        assert_eq!(report.pushed, 2);
    }

    #[test]
    fn test_flush_replaces_pending() {
        let queue = WorkQueue::new();
        queue.schedule(vec![item("0"), item("1")], false);
        let report = queue.schedule(vec![item("1"), item("3")], true);

        assert_eq!(report.flushed, 2);
        assert_eq!(report.pushed, 2);
        assert_eq!(queue.pending(), vec![item("1"), item("3")]);
    }

    #[test]
    fn test_popped_item_can_be_requeued() {
        let queue = WorkQueue::new();
        queue.schedule(vec![item("0")], false);
        let popped = queue.pop_blocking().unwrap();
        assert!(!queue.contains(&popped));

        let report = queue.schedule(vec![popped], false);
        assert_eq!(report.pushed, 1);
    }

    #[test]
    fn test_blocked_worker_wakes_on_push() {
        let queue = Arc::new(WorkQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.pop_blocking())
        };

        std::thread::sleep(Duration::from_millis(20));
        queue.schedule(vec![item("2")], false);

        assert_eq!(worker.join().unwrap(), Some(item("2")));
    }

    #[test]
    fn test_shutdown_releases_waiting_workers() {
        let queue = Arc::new(WorkQueue::new());
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || queue.pop_blocking())
            })
            .collect();

        std::thread::sleep(Duration::from_millis(20));
        queue.shutdown();

        for worker in workers {
            assert_eq!(worker.join().unwrap(), None);
        }
        assert!(queue.is_shutdown());
    }

    #[test]
    fn test_schedule_after_shutdown_is_ignored() {
        let queue = WorkQueue::new();
        queue.shutdown();
        let report = queue.schedule(vec![item("0")], false);
        assert_eq!(report, ScheduleReport::default());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wait_idle_tracks_active_items() {
        let queue = WorkQueue::new();
        assert!(queue.wait_idle(Duration::from_millis(1)));

        queue.schedule(vec![item("0")], false);
        let _item = queue.pop_blocking().unwrap();
        assert_eq!(queue.active(), 1);
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        queue.task_done();
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }
}
