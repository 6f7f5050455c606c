//! End-to-End Scenario
//!
//! Seed 0, 50 concurrent calls, 50 ms delay: every lost-update-free strategy
//! ends at 50 in the store, and the cache agrees.

use crate::common::*;

#[test]
fn fifty_concurrent_calls_with_delay() {
    for kind in COHERENT {
        let tally = open(kind, 0, 50);
        let results = concurrent_increments(&tally, 50);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 50, "{}", kind);

        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 50, "{}", kind);
        assert_eq!(snapshot.cached, Some(50), "{}", kind);
    }
}

#[test]
fn load_trial_reports_per_strategy() {
    for kind in StrategyKind::ALL {
        let tally = Tally::builder()
            .strategy(kind)
            .delay_ms(0)
            .load(10, 10)
            .open()
            .unwrap();
        let report = tally.run_load().unwrap();

        assert_eq!(report.total_calls, 100);
        assert_eq!(report.succeeded, 100, "{}", kind);
        assert!(report.store_consistent(), "{}", kind);
        if kind.prevents_lost_updates() {
            assert!(report.cache_consistent(), "{}", kind);
        }
    }
}
