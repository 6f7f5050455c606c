//! Concurrent load harness
//!
//! Fires `threads × calls_per_thread` increments at one resource from
//! scoped OS threads released together by a barrier, then reads back both
//! materializations of the counter.

use crate::config::TallyConfig;
use crate::dispatcher::{CachePriming, CounterSnapshot, Dispatcher};
use serde::Serialize;
use std::sync::Barrier;
use std::time::{Duration, Instant};
use tally_concurrency::{MetricsSnapshot, StrategyKind};
use tally_core::{ResourceId, Result};
use tracing::info;

/// Shape of one load trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTest {
    /// Concurrent callers
    pub threads: usize,
    /// Increments per caller
    pub calls_per_thread: usize,
    /// Resource every call increments
    pub resource_id: ResourceId,
}

impl LoadTest {
    /// Trial shape from configuration, targeting the first resource
    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        let resource_id = config
            .resources
            .first()
            .copied()
            .ok_or_else(|| tally_core::Error::Config("no resources configured".into()))?;
        Ok(Self {
            threads: config.load.threads,
            calls_per_thread: config.load.calls_per_thread,
            resource_id,
        })
    }

    /// Total increments attempted
    pub fn total_calls(&self) -> usize {
        self.threads * self.calls_per_thread
    }

    /// Run the trial against `dispatcher` with its configured strategy
    pub fn run(&self, dispatcher: &Dispatcher) -> Result<TrialReport> {
        let raw = self.resource_id.get();
        let before = dispatcher.snapshot(raw)?;
        let barrier = Barrier::new(self.threads);

        let start = Instant::now();
        let (succeeded, failed) = std::thread::scope(|s| {
            let handles: Vec<_> = (0..self.threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        let mut ok = 0usize;
                        for _ in 0..self.calls_per_thread {
                            if dispatcher.increment(raw).is_success() {
                                ok += 1;
                            }
                        }
                        ok
                    })
                })
                .collect();

            let succeeded: usize = handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(0))
                .sum();
            (succeeded, self.total_calls() - succeeded)
        });
        let elapsed = start.elapsed();

        let after = dispatcher.snapshot(raw)?;
        let report = TrialReport {
            strategy: dispatcher.strategy(),
            total_calls: self.total_calls(),
            succeeded,
            failed,
            elapsed_ms: elapsed.as_millis() as u64,
            initial: before.durable,
            counter: after,
            metrics: dispatcher.metrics(),
        };
        info!(
            strategy = %report.strategy,
            succeeded,
            failed,
            durable = after.durable,
            cached = ?after.cached,
            elapsed_ms = report.elapsed_ms,
            "trial finished"
        );
        Ok(report)
    }
}

/// Outcome of one trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialReport {
    /// Strategy under test
    pub strategy: StrategyKind,
    /// Increments attempted
    pub total_calls: usize,
    /// Increments that returned success
    pub succeeded: usize,
    /// Increments that returned an error
    pub failed: usize,
    /// Wall-clock duration of the trial
    pub elapsed_ms: u64,
    /// Durable value before the trial
    pub initial: i64,
    /// Both materializations after the trial
    pub counter: CounterSnapshot,
    /// Strategy counters after the trial
    pub metrics: MetricsSnapshot,
}

impl TrialReport {
    /// Durable value the successful increments should have produced
    pub fn expected(&self) -> i64 {
        self.initial + self.succeeded as i64
    }

    /// Durable store reflects every successful increment
    pub fn store_consistent(&self) -> bool {
        self.counter.durable == self.expected()
    }

    /// Cache agrees with the store, or holds nothing
    pub fn cache_consistent(&self) -> bool {
        self.counter.is_coherent()
    }

    /// Increments the cache is missing relative to the store
    pub fn cache_lag(&self) -> i64 {
        self.counter
            .cached
            .map_or(0, |cached| self.counter.durable - cached)
    }

    /// Trial duration
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Run the configured trial once per strategy, each on a fresh store and cache
pub fn compare(config: &TallyConfig, kinds: &[StrategyKind]) -> Result<Vec<TrialReport>> {
    let test = LoadTest::from_config(config)?;
    kinds
        .iter()
        .map(|&kind| {
            let dispatcher = Dispatcher::builder()
                .resources(config.resources.iter().copied())
                .seed(config.seed)
                .strategy(kind)
                .settings(config.strategy_settings())
                .delay(std::sync::Arc::new(tally_concurrency::FixedDelay::new(config.delay())))
                .build()?;
            dispatcher.prime(CachePriming::for_strategy(kind))?;
            test.run(&dispatcher)
        })
        .collect()
}
