//! In-memory cache with watch support
//!
//! # Design
//!
//! - One `Mutex<CacheState>`: each command holds it for its whole duration,
//!   which gives the same total order a single-threaded server gives
//! - FxHashMap for values, O(1) lookups
//! - Revisions: every mutation of a key stamps it with a fresh global
//!   revision. Revisions outlive deletes, so delete-then-set between a watch
//!   and its commit is still seen as a modification.
//!
//! Multi-command sequences are NOT atomic. Callers that need a
//! read-modify-write use [`Cache::watch`] + [`Cache::commit`].

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tally_core::{
    Cache, CacheKey, CommitOutcome, Component, Error, FaultPlan, FaultPoint, Result, WatchToken,
};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<CacheKey, i64>,
    revisions: FxHashMap<CacheKey, u64>,
    next_revision: u64,
}

impl CacheState {
    /// Stamp `key` as modified
    fn touch(&mut self, key: &CacheKey) {
        self.next_revision += 1;
        self.revisions.insert(key.clone(), self.next_revision);
    }

    fn revision(&self, key: &CacheKey) -> u64 {
        self.revisions.get(key).copied().unwrap_or(0)
    }
}

/// Snapshot of command counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// `get` calls that found a value
    pub hits: u64,
    /// `get` calls that found nothing
    pub misses: u64,
    /// Unconditional writes
    pub sets: u64,
    /// Deletes (existing or not)
    pub deletes: u64,
    /// Atomic increments
    pub increments: u64,
    /// Successful conditional commits
    pub commits: u64,
    /// Conditional commits rejected by a watch
    pub conflicts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    increments: AtomicU64,
    commits: AtomicU64,
    conflicts: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Single-threaded-semantics in-memory cache
///
/// # Example
///
/// ```
/// use tally_cache::MemoryCache;
/// use tally_core::{Cache, CacheKey, CommitOutcome};
///
/// let cache = MemoryCache::new();
/// let key = CacheKey::new("post:1:view_count");
///
/// let token = cache.watch(&key).unwrap();
/// cache.set(&key, 5).unwrap();
/// assert_eq!(cache.commit(token, 1).unwrap(), CommitOutcome::Conflict);
/// assert_eq!(cache.get(&key).unwrap(), Some(5));
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    state: Mutex<CacheState>,
    counters: Counters,
    faults: FaultPlan,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure plan consulted by every command
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Remove every key (FLUSHALL); revisions are kept
    pub fn flush(&self) {
        let mut state = self.state.lock();
        let keys: Vec<CacheKey> = state.entries.keys().cloned().collect();
        for key in &keys {
            state.touch(key);
        }
        state.entries.clear();
        debug!(removed = keys.len(), "cache flushed");
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if no key holds a value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of command counters
    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            sets: c.sets.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            increments: c.increments.load(Ordering::Relaxed),
            commits: c.commits.load(Ordering::Relaxed),
            conflicts: c.conflicts.load(Ordering::Relaxed),
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<i64>> {
        self.faults.check(FaultPoint::CacheGet)?;
        let value = self.state.lock().entries.get(key).copied();
        match value {
            Some(_) => Counters::bump(&self.counters.hits),
            None => Counters::bump(&self.counters.misses),
        }
        trace!(%key, ?value, "GET");
        Ok(value)
    }

    fn set(&self, key: &CacheKey, value: i64) -> Result<()> {
        self.faults.check(FaultPoint::CacheSet)?;
        let mut state = self.state.lock();
        state.entries.insert(key.clone(), value);
        state.touch(key);
        Counters::bump(&self.counters.sets);
        trace!(%key, value, "SET");
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool> {
        self.faults.check(FaultPoint::CacheDelete)?;
        let mut state = self.state.lock();
        let existed = state.entries.remove(key).is_some();
        if existed {
            state.touch(key);
        }
        Counters::bump(&self.counters.deletes);
        trace!(%key, existed, "DEL");
        Ok(existed)
    }

    fn increment(&self, key: &CacheKey) -> Result<i64> {
        self.faults.check(FaultPoint::CacheIncrement)?;
        let mut state = self.state.lock();
        let current = state.entries.get(key).copied().unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::fatal(Component::Cache, format!("increment overflow on {}", key)))?;
        state.entries.insert(key.clone(), next);
        state.touch(key);
        Counters::bump(&self.counters.increments);
        trace!(%key, value = next, "INCR");
        Ok(next)
    }

    fn exists(&self, key: &CacheKey) -> Result<bool> {
        self.faults.check(FaultPoint::CacheExists)?;
        Ok(self.state.lock().entries.contains_key(key))
    }

    fn watch(&self, key: &CacheKey) -> Result<WatchToken> {
        self.faults.check(FaultPoint::CacheWatch)?;
        let revision = self.state.lock().revision(key);
        trace!(%key, revision, "WATCH");
        Ok(WatchToken::new(key.clone(), revision))
    }

    fn commit(&self, token: WatchToken, value: i64) -> Result<CommitOutcome> {
        self.faults.check(FaultPoint::CacheCommit)?;
        let mut state = self.state.lock();
        let key = token.key();
        let current = state.revision(key);
        if current != token.revision() {
            Counters::bump(&self.counters.conflicts);
            debug!(%key, watched = token.revision(), current, "EXEC aborted by watch");
            return Ok(CommitOutcome::Conflict);
        }
        state.entries.insert(key.clone(), value);
        state.touch(key);
        Counters::bump(&self.counters.commits);
        trace!(%key, value, "EXEC");
        Ok(CommitOutcome::Committed(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tally_core::FaultKind;

    fn key() -> CacheKey {
        CacheKey::new("post:1:view_count")
    }

    #[test]
    fn test_basic_commands() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&key()).unwrap(), None);
        assert!(!cache.exists(&key()).unwrap());

        cache.set(&key(), 4).unwrap();
        assert_eq!(cache.get(&key()).unwrap(), Some(4));
        assert!(cache.exists(&key()).unwrap());

        assert!(cache.delete(&key()).unwrap());
        assert!(!cache.delete(&key()).unwrap());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.deletes, 2);
    }

    #[test]
    fn test_increment_missing_key_starts_at_zero() {
        let cache = MemoryCache::new();
        assert_eq!(cache.increment(&key()).unwrap(), 1);
        assert_eq!(cache.increment(&key()).unwrap(), 2);
    }

    #[test]
    fn test_commit_without_interference() {
        let cache = MemoryCache::new();
        cache.set(&key(), 1).unwrap();
        let token = cache.watch(&key()).unwrap();
        assert_eq!(cache.get(&key()).unwrap(), Some(1));
        assert_eq!(cache.commit(token, 2).unwrap(), CommitOutcome::Committed(2));
        assert_eq!(cache.get(&key()).unwrap(), Some(2));
    }

    #[test]
    fn test_commit_on_missing_key() {
        let cache = MemoryCache::new();
        let token = cache.watch(&key()).unwrap();
        assert_eq!(cache.commit(token, 1).unwrap(), CommitOutcome::Committed(1));
    }

    #[test]
    fn test_delete_then_recreate_conflicts() {
        let cache = MemoryCache::new();
        cache.set(&key(), 3).unwrap();
        let token = cache.watch(&key()).unwrap();
        cache.delete(&key()).unwrap();
        cache.set(&key(), 3).unwrap();
        assert_eq!(cache.commit(token, 4).unwrap(), CommitOutcome::Conflict);
        assert_eq!(cache.stats().conflicts, 1);
    }

    #[test]
    fn test_flush_invalidates_watchers() {
        let cache = MemoryCache::new();
        cache.set(&key(), 3).unwrap();
        let token = cache.watch(&key()).unwrap();
        cache.flush();
        assert_eq!(cache.commit(token, 4).unwrap(), CommitOutcome::Conflict);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_watch_transaction_passes_current_value() {
        let cache = MemoryCache::new();
        cache.set(&key(), 10).unwrap();
        let outcome = cache
            .watch_transaction(&key(), &mut |current| Ok(current.unwrap_or(0) + 1))
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed(11));
    }

    #[test]
    fn test_watch_transaction_body_can_lose_race() {
        let cache = MemoryCache::new();
        let outcome = cache
            .watch_transaction(&key(), &mut |_| {
                cache.set(&key(), 99)?;
                Ok(1)
            })
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict);
        assert_eq!(cache.get(&key()).unwrap(), Some(99));
    }

    #[test]
    fn test_injected_failure() {
        let cache = MemoryCache::new();
        cache
            .faults()
            .fail_next(FaultPoint::CacheSet, FaultKind::Transient, 1);
        assert!(cache.set(&key(), 1).unwrap_err().is_retryable());
        assert_eq!(cache.get(&key()).unwrap(), None);
        cache.set(&key(), 1).unwrap();
    }

    #[test]
    fn test_concurrent_increments_are_unique() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 200;

        let cache = Arc::new(MemoryCache::new());
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..PER_THREAD)
                        .map(|_| cache.increment(&key()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for value in h.join().unwrap() {
                assert!(seen.insert(value), "value {} returned twice", value);
            }
        }
        let total = (THREADS * PER_THREAD) as i64;
        assert_eq!(seen.len() as i64, total);
        assert_eq!(cache.get(&key()).unwrap(), Some(total));
    }

    proptest! {
        #[test]
        fn prop_any_mutation_between_watch_and_commit_conflicts(
            seed in -1_000_000i64..1_000_000,
            mutation in 0u8..3,
        ) {
            let cache = MemoryCache::new();
            cache.set(&key(), seed).unwrap();
            let token = cache.watch(&key()).unwrap();
            match mutation {
                0 => cache.set(&key(), seed).unwrap(),
                1 => { cache.delete(&key()).unwrap(); }
                _ => { cache.increment(&key()).ok(); }
            }
            prop_assert_eq!(cache.commit(token, 0).unwrap(), CommitOutcome::Conflict);
        }
    }
}
