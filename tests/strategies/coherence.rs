//! Coherence Tests
//!
//! For every strategy that prevents lost updates, K concurrent increments
//! leave `durable == cached == seed + K`.

use crate::common::*;

fn assert_coherent(kind: StrategyKind, k: usize, delay_ms: u64) {
    let tally = open(kind, 0, delay_ms);
    let results = concurrent_increments(&tally, k);
    assert!(results.iter().all(|r| r.is_ok()), "{} k={} delay={}", kind, k, delay_ms);

    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!(snapshot.durable, k as i64, "{} k={} delay={}", kind, k, delay_ms);
    assert_eq!(snapshot.cached, Some(k as i64), "{} k={} delay={}", kind, k, delay_ms);
}

// ============================================================================
// No delay
// ============================================================================

#[test]
fn coherent_strategies_without_delay() {
    for kind in COHERENT {
        for k in [1, 10, 100] {
            assert_coherent(kind, k, 0);
        }
    }
}

// ============================================================================
// 50 ms delay
// ============================================================================

#[test]
fn optimistic_with_delay() {
    for k in [1, 10, 100] {
        assert_coherent(StrategyKind::Optimistic, k, 50);
    }
}

#[test]
fn double_checked_with_delay() {
    for k in [1, 10, 100] {
        assert_coherent(StrategyKind::DoubleChecked, k, 50);
    }
}

#[test]
fn atomic_with_delay() {
    for k in [1, 10, 100] {
        assert_coherent(StrategyKind::Atomic, k, 50);
    }
}

#[test]
fn global_lock_with_delay() {
    for k in [1, 10, 100] {
        assert_coherent(StrategyKind::GlobalLock, k, 50);
    }
}

#[test]
fn resource_lock_with_delay() {
    for k in [1, 10, 100] {
        assert_coherent(StrategyKind::ResourceLock, k, 50);
    }
}

// ============================================================================
// Non-zero seed
// ============================================================================

#[test]
fn coherent_strategies_respect_seed() {
    for kind in COHERENT {
        let tally = open(kind, 1_000, 0);
        concurrent_increments(&tally, 10);
        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 1_010, "{}", kind);
        assert_eq!(snapshot.cached, Some(1_010), "{}", kind);
    }
}

#[test]
fn lock_strategies_report_distinct_values() {
    for kind in [StrategyKind::GlobalLock, StrategyKind::ResourceLock, StrategyKind::Atomic] {
        let tally = open(kind, 0, 0);
        let mut reported = values(concurrent_increments(&tally, 20));
        reported.sort_unstable();
        assert_eq!(reported, (1..=20).collect::<Vec<_>>(), "{}", kind);
    }
}

// ============================================================================
// Sequential increments
// ============================================================================

mod sequential {
    use crate::common::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn every_strategy_counts_serial_calls(
            index in 0..StrategyKind::ALL.len(),
            seed in -1_000i64..1_000,
            calls in 1usize..20,
        ) {
            let kind = StrategyKind::ALL[index];
            let tally = open(kind, seed, 0);
            for _ in 0..calls {
                tally.increment(1).unwrap();
            }

            let snapshot = tally.snapshot(1).unwrap();
            prop_assert_eq!(snapshot.durable, seed + calls as i64);
            prop_assert!(snapshot.is_coherent());
            if kind.keeps_cache_populated() {
                prop_assert_eq!(snapshot.cached, Some(seed + calls as i64));
            }
        }
    }
}
