//! Shared helpers for strategy tests.

use std::sync::{Arc, Barrier};
use std::thread;

pub use tallydb::prelude::*;
pub use tallydb::{CachePriming, FaultKind, FaultPoint, NoDelay};

/// Strategies whose cache ends equal to the store under contention.
pub const COHERENT: [StrategyKind; 5] = [
    StrategyKind::Optimistic,
    StrategyKind::DoubleChecked,
    StrategyKind::Atomic,
    StrategyKind::GlobalLock,
    StrategyKind::ResourceLock,
];

pub fn open(kind: StrategyKind, seed: i64, delay_ms: u64) -> Arc<Tally> {
    Arc::new(
        Tally::builder()
            .strategy(kind)
            .seed(seed)
            .delay_ms(delay_ms)
            .open()
            .expect("open tally"),
    )
}

pub fn open_with_hook(kind: StrategyKind, hook: Arc<dyn tallydb::DelayHook>) -> Arc<Tally> {
    Arc::new(
        Tally::builder()
            .strategy(kind)
            .delay_hook(hook)
            .open()
            .expect("open tally"),
    )
}

/// Fire `k` increments of resource 1 at once, one thread each.
pub fn concurrent_increments(tally: &Arc<Tally>, k: usize) -> Vec<Result<i64>> {
    let barrier = Arc::new(Barrier::new(k));
    let handles: Vec<_> = (0..k)
        .map(|_| {
            let tally = Arc::clone(tally);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                tally.increment(1)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

pub fn values(results: Vec<Result<i64>>) -> Vec<i64> {
    results.into_iter().map(|r| r.expect("increment")).collect()
}
