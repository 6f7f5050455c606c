//! Optimistic compare-and-swap loop
//!
//! ```text
//! loop:
//!   watch key
//!   read cache (miss: read store as seed)
//!   new = read + 1
//!   delay
//!   lock store row
//!   conditional cache commit(new)
//!     conflict  -> roll back, retry
//!     committed -> store write(new) + commit, return new
//! ```
//!
//! The store row lock is taken before the conditional commit and held until
//! the store commit. A request whose cache commit wins therefore also writes
//! the store before any later winner does, so overwriting the store with
//! `new` cannot move it backwards.

use super::{overflow, StrategyKind};
use crate::context::StrategyContext;
use crate::delay::Phase;
use tally_core::{CommitOutcome, Component, Error, ResourceId, Result};
use tracing::{debug, info, warn};

const KIND: StrategyKind = StrategyKind::Optimistic;

pub(super) fn increment(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    let key = ctx.key(id);
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        if !ctx.settings.retry.allows(attempt) {
            let attempts = attempt - 1;
            warn!(resource_id = %id, attempts, "optimistic loop exhausted");
            return Err(Error::Exhausted { key, attempts });
        }

        let token = ctx.cache.watch(&key)?;
        let read = match ctx.cache.get(&key)? {
            Some(value) => value,
            None => ctx.store.read_committed(id)?,
        };
        let new = read.checked_add(1).ok_or_else(|| overflow(id))?;
        debug!(resource_id = %id, attempt, read, new, "watched read");

        ctx.pause(KIND, id, Phase::Processing);

        let mut txn = ctx.store.begin()?;
        txn.read_for_update(id)?;

        ctx.pause(KIND, id, Phase::BeforeCacheWrite);

        match ctx.cache.commit(token, new)? {
            CommitOutcome::Conflict => {
                txn.rollback()?;
                ctx.metrics.record_conflict();
                warn!(resource_id = %id, attempt, "conflict, retrying");
            }
            CommitOutcome::Committed(value) => {
                txn.write(id, value)
                    .and_then(|()| txn.commit())
                    .map_err(|e| Error::desync(id, Component::Cache, e))?;
                info!(resource_id = %id, attempt, value, "cache and store updated");
                return Ok(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::{RetryPolicy, Rendezvous};
    use std::num::NonZeroU32;
    use std::time::Duration;
    use tally_core::{Cache, FaultKind, FaultPoint};

    #[test]
    fn test_conflict_triggers_retry() {
        let fixture = Fixture::primed(0);
        let gate = Rendezvous::new(Phase::Processing, 1);

        std::thread::scope(|s| {
            let a = s.spawn(|| increment(&fixture.ctx(&gate), id()));
            assert!(gate.wait_for_parked(1, Duration::from_secs(5)));

            assert_eq!(increment(&fixture.ctx(&gate), id()).unwrap(), 1);

            gate.release();
            // A's watch was invalidated by B, so A retries from 1.
            assert_eq!(a.join().unwrap().unwrap(), 2);
        });

        assert_eq!(fixture.durable(), 2);
        assert_eq!(fixture.cached(), Some(2));
        assert_eq!(fixture.metrics.snapshot().conflicts, 1);
    }

    #[test]
    fn test_cold_cache_seeds_from_store() {
        let fixture = Fixture::new(41);
        assert_eq!(increment(&fixture.no_delay(), id()).unwrap(), 42);
        assert_eq!(fixture.durable(), 42);
        assert_eq!(fixture.cached(), Some(42));
    }

    #[test]
    fn test_bounded_retry_exhausts() {
        let mut fixture = Fixture::primed(0);
        fixture.settings.retry = RetryPolicy::with_max_attempts(NonZeroU32::new(1).unwrap());
        let gate = Rendezvous::new(Phase::Processing, 1);

        std::thread::scope(|s| {
            let a = s.spawn(|| increment(&fixture.ctx(&gate), id()));
            assert!(gate.wait_for_parked(1, Duration::from_secs(5)));
            fixture.cache.set(&key(), 100).unwrap();
            gate.release();

            match a.join().unwrap().unwrap_err() {
                Error::Exhausted { attempts, .. } => assert_eq!(attempts, 1),
                other => panic!("expected exhausted, got {}", other),
            }
        });

        assert_eq!(fixture.durable(), 0);
        assert_eq!(fixture.cached(), Some(100));
    }

    #[test]
    fn test_store_commit_failure_after_cache_commit_is_desync() {
        let fixture = Fixture::primed(5);
        fixture
            .store
            .faults()
            .fail_next(FaultPoint::StoreCommit, FaultKind::Fatal, 1);

        match increment(&fixture.no_delay(), id()).unwrap_err() {
            Error::PartialWriteDesync { committed, source, .. } => {
                assert_eq!(committed, Component::Cache);
                assert!(matches!(*source, Error::Fatal { .. }));
            }
            other => panic!("expected desync, got {}", other),
        }
        assert_eq!(fixture.cached(), Some(6));
        assert_eq!(fixture.durable(), 5);
    }
}
