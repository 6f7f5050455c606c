//! Write-Through Strategy Tests
//!
//! Overwrite can land a stale value; invalidate leaves nothing stale behind.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn overwrite_race_leaves_cache_below_store() {
    let gate = Arc::new(Rendezvous::new(Phase::BeforeCacheWrite, 1));
    let tally = open_with_hook(StrategyKind::WriteThrough, gate.clone());

    let first = {
        let tally = Arc::clone(&tally);
        thread::spawn(move || tally.increment(1))
    };
    assert!(gate.wait_for_parked(1, Duration::from_secs(5)));

    assert_eq!(tally.increment(1).unwrap(), 2);
    gate.release();
    assert_eq!(first.join().unwrap().unwrap(), 1);

    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!(snapshot.durable, 2);
    let cached = snapshot.cached.unwrap();
    assert!(cached < snapshot.durable, "cache {} store {}", cached, snapshot.durable);
}

#[test]
fn overwrite_store_is_correct() {
    let tally = open(StrategyKind::WriteThrough, 0, 10);
    let results = concurrent_increments(&tally, 20);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(tally.snapshot(1).unwrap().durable, 20);
}

#[test]
fn invalidate_leaves_key_absent() {
    for delay_ms in [0, 50] {
        let tally = open(StrategyKind::WriteInvalidate, 0, delay_ms);
        let results = concurrent_increments(&tally, 10);
        assert!(results.iter().all(|r| r.is_ok()));

        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 10);
        assert_eq!(snapshot.cached, None);
    }
}

#[test]
fn read_after_invalidate_matches_store() {
    let tally = open(StrategyKind::WriteInvalidate, 5, 0);
    concurrent_increments(&tally, 25);

    assert_eq!(tally.read_view(1).unwrap(), 30);
    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!(snapshot.cached, Some(30));
    assert!(snapshot.is_coherent());
}

#[test]
fn invalidate_reports_store_value() {
    let tally = open(StrategyKind::WriteInvalidate, 0, 0);
    assert_eq!(tally.increment(1).unwrap(), 1);
    assert_eq!(tally.increment(1).unwrap(), 2);
}
