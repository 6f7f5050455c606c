//! Naive Strategy Tests
//!
//! The store never loses an increment; the cache does.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn store_is_correct_under_contention() {
    for k in [1, 10, 100] {
        let tally = open(StrategyKind::Naive, 0, 50);
        let results = concurrent_increments(&tally, k);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(tally.snapshot(1).unwrap().durable, k as i64);
    }
}

#[test]
fn deterministic_interleaving_loses_cache_update() {
    let gate = Arc::new(Rendezvous::new(Phase::Processing, 1));
    let tally = open_with_hook(StrategyKind::Naive, gate.clone());

    let first = {
        let tally = Arc::clone(&tally);
        thread::spawn(move || tally.increment(1))
    };
    assert!(gate.wait_for_parked(1, Duration::from_secs(5)));

    assert_eq!(tally.increment(1).unwrap(), 1);
    gate.release();
    assert_eq!(first.join().unwrap().unwrap(), 1);

    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!(snapshot.durable, 2);
    assert_eq!(snapshot.cached, Some(1));
    assert!(!snapshot.is_coherent());
}

#[test]
fn delay_exposes_lost_updates() {
    let lost = (0..5).any(|_| {
        let tally = open(StrategyKind::Naive, 0, 50);
        concurrent_increments(&tally, 50);
        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 50);
        snapshot.cached.unwrap_or(0) < 50
    });
    assert!(lost, "no lost cache update in five trials");
}
