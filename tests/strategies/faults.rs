//! Failure Path Tests
//!
//! Rollback on store failure, desync on a failed second write.

use crate::common::*;

#[test]
fn commit_failure_rolls_back_store() {
    for kind in [StrategyKind::Naive, StrategyKind::GlobalLock, StrategyKind::WriteThrough] {
        let tally = open(kind, 3, 0);
        tally
            .store()
            .faults()
            .fail_next(FaultPoint::StoreCommit, FaultKind::Fatal, 1);

        let response = tally.respond(1);
        assert_eq!(response.status_code(), 500, "{}", kind);

        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 3, "{}", kind);
        assert_eq!(snapshot.cached, Some(3), "{}", kind);
        assert!(tally.metrics().store.rollbacks >= 1);

        assert_eq!(tally.increment(1).unwrap(), 4, "{}", kind);
    }
}

#[test]
fn transient_store_outage_is_retryable() {
    let tally = open(StrategyKind::ResourceLock, 0, 0);
    tally
        .store()
        .faults()
        .fail_next(FaultPoint::StoreBegin, FaultKind::Transient, 1);

    let err = tally.increment(1).unwrap_err();
    assert!(err.is_retryable(), "{}", err);
    assert_eq!(tally.increment(1).unwrap(), 1);
}

#[test]
fn failed_cache_write_after_store_commit_is_desync() {
    for (kind, point) in [
        (StrategyKind::Naive, FaultPoint::CacheSet),
        (StrategyKind::WriteThrough, FaultPoint::CacheSet),
        (StrategyKind::WriteInvalidate, FaultPoint::CacheDelete),
    ] {
        let tally = open(kind, 0, 0);
        tally.cache().faults().fail_next(point, FaultKind::Transient, 1);

        let err = tally.increment(1).unwrap_err();
        assert!(err.is_desync(), "{}: {}", kind, err);

        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!(snapshot.durable, 1, "{}", kind);
        assert_eq!(snapshot.cached, Some(0), "{}", kind);
        assert_eq!(tally.metrics().coordination.desyncs, 1);
    }
}

#[test]
fn failed_store_write_after_cache_commit_is_desync() {
    for kind in [StrategyKind::Optimistic, StrategyKind::Atomic, StrategyKind::DoubleChecked] {
        let tally = open(kind, 0, 0);
        // Seeded so no store read happens before the cache write.
        tally.prime_with(CachePriming::Seed).unwrap();
        tally
            .store()
            .faults()
            .fail_next(FaultPoint::StoreCommit, FaultKind::Fatal, 1);

        let err = tally.increment(1).unwrap_err();
        assert!(err.is_desync(), "{}: {}", kind, err);
        let snapshot = tally.snapshot(1).unwrap();
        assert_eq!((snapshot.durable, snapshot.cached), (0, Some(1)), "{}", kind);
    }
}

#[test]
fn cache_outage_before_any_write_leaves_both_untouched() {
    let tally = open(StrategyKind::Atomic, 0, 0);
    tally
        .cache()
        .faults()
        .fail_next(FaultPoint::CacheIncrement, FaultKind::Transient, 1);

    let err = tally.increment(1).unwrap_err();
    assert!(!err.is_desync());
    let snapshot = tally.snapshot(1).unwrap();
    assert_eq!((snapshot.durable, snapshot.cached), (0, Some(0)));
}
