//! Coordination counters shared by every strategy invocation

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`CoordinationMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Strategy invocations started
    pub requests: u64,
    /// Invocations that returned a value
    pub succeeded: u64,
    /// Invocations that returned an error
    pub failed: u64,
    /// Optimistic commits rejected by a watch
    pub conflicts: u64,
    /// Optimistic loops that ran out of attempts
    pub exhausted: u64,
    /// Failures that left store and cache diverged
    pub desyncs: u64,
    /// Cache seeds loaded under the double-checked init lock
    pub init_loads: u64,
}

/// Lock-free counters updated by strategies
#[derive(Debug, Default)]
pub struct CoordinationMetrics {
    requests: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    conflicts: AtomicU64,
    exhausted: AtomicU64,
    desyncs: AtomicU64,
    init_loads: AtomicU64,
}

impl CoordinationMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, result: &tally_core::Result<i64>) {
        match result {
            Ok(_) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if e.is_desync() {
                    self.desyncs.fetch_add(1, Ordering::Relaxed);
                }
                if matches!(e, tally_core::Error::Exhausted { .. }) {
                    self.exhausted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_init_load(&self) {
        self.init_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            desyncs: self.desyncs.load(Ordering::Relaxed),
            init_loads: self.init_loads.load(Ordering::Relaxed),
        }
    }
}
