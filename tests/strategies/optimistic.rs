//! Optimistic Strategy Tests
//!
//! Watch/commit retries serialize the cache; each caller gets a distinct
//! value and the store follows the cache's commit order.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn returned_values_are_exactly_seed_plus_one_to_k() {
    for (seed, k) in [(0, 1), (0, 10), (7, 100)] {
        let tally = open(StrategyKind::Optimistic, seed, 0);
        let mut reported = values(concurrent_increments(&tally, k));
        reported.sort_unstable();
        let expected: Vec<i64> = (seed + 1..=seed + k as i64).collect();
        assert_eq!(reported, expected, "seed={} k={}", seed, k);
    }
}

#[test]
fn conflicts_are_retried_not_surfaced() {
    let tally = open(StrategyKind::Optimistic, 0, 5);
    let results = concurrent_increments(&tally, 10);
    assert!(results.iter().all(|r| r.is_ok()));

    let metrics = tally.metrics().coordination;
    assert_eq!(metrics.succeeded, 10);
    assert!(metrics.conflicts > 0);
}

#[test]
fn bounded_retries_report_exhausted() {
    let gate = Arc::new(Rendezvous::new(Phase::Processing, 1));
    let tally = Arc::new(
        Tally::builder()
            .strategy(StrategyKind::Optimistic)
            .delay_hook(gate.clone())
            .max_attempts(1)
            .open()
            .unwrap(),
    );

    let first = {
        let tally = Arc::clone(&tally);
        thread::spawn(move || tally.increment(1))
    };
    assert!(gate.wait_for_parked(1, Duration::from_secs(5)));
    assert_eq!(tally.increment(1).unwrap(), 1);
    gate.release();

    let err = first.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Exhausted { attempts: 1, .. }), "{}", err);
    assert!(err.is_retryable());

    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!((snapshot.durable, snapshot.cached), (1, Some(1)));
    assert_eq!(tally.metrics().coordination.exhausted, 1);
}

#[test]
fn cold_cache_seeds_from_store() {
    let tally = open(StrategyKind::Optimistic, 30, 0);
    tally.prime_with(CachePriming::Clear).unwrap();

    let mut reported = values(concurrent_increments(&tally, 10));
    reported.sort_unstable();
    assert_eq!(reported, (31..=40).collect::<Vec<_>>());
    assert_eq!(tally.snapshot(1).unwrap().cached, Some(40));
}
