//! Queue metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for one dispatcher instance
#[derive(Debug, Default)]
pub struct QueueMetrics {
    /// Entries currently waiting
    pending: AtomicUsize,
    /// Entries accepted by enqueue
    enqueued_count: AtomicU64,
    /// Enqueue calls that were no-ops
    ignored_count: AtomicU64,
    /// Entries whose send succeeded
    dispatched_count: AtomicU64,
    /// Entries whose send returned an error or panicked
    failure_count: AtomicU64,
    /// Entries handed back on a discarding shutdown
    discarded_count: AtomicU64,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn set_pending(&self, len: usize) {
        self.pending.store(len, Ordering::Relaxed);
    }

    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued_count(&self) {
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ignored_count(&self) -> u64 {
        self.ignored_count.load(Ordering::Relaxed)
    }

    pub fn inc_ignored_count(&self) {
        self.ignored_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    pub fn inc_dispatched_count(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded_count.load(Ordering::Relaxed)
    }

    pub fn add_discarded_count(&self, n: u64) {
        self.discarded_count.fetch_add(n, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pending: self.pending(),
            enqueued_count: self.enqueued_count(),
            ignored_count: self.ignored_count(),
            dispatched_count: self.dispatched_count(),
            failure_count: self.failure_count(),
            discarded_count: self.discarded_count(),
        }
    }
}

/// Snapshot of queue metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pending: usize,
    pub enqueued_count: u64,
    pub ignored_count: u64,
    pub dispatched_count: u64,
    pub failure_count: u64,
    pub discarded_count: u64,
}

impl MetricsSnapshot {
    /// Accepted entries that have left the queue one way or another
    pub fn settled(&self) -> u64 {
        self.dispatched_count + self.failure_count + self.discarded_count
    }
}
