//! Store and cache contracts
//!
//! Strategies only ever see these traits. The in-memory implementations live
//! in `tally-storage` and `tally-cache`; anything that satisfies the same
//! contract (a SQL row store, a Redis client) can be slotted in at this seam.

use crate::error::Result;
use crate::types::{CacheKey, ResourceId};

/// Transactional row store holding one integer counter per resource
///
/// Every operation runs inside a [`StoreTransaction`]. Concurrent increments
/// of the same row are serialized by the row lock, so `increment` followed by
/// `commit` never loses an update.
pub trait DurableStore: Send + Sync {
    /// Open a unit of work
    ///
    /// Fails with `TransientUnavailable` when the store cannot be reached.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Row-level "+1" in its own transaction; returns the committed value
    fn atomic_increment(&self, id: ResourceId) -> Result<i64> {
        let mut txn = self.begin()?;
        let value = txn.increment(id)?;
        txn.commit()?;
        Ok(value)
    }

    /// Read the last committed value in its own transaction
    fn read_committed(&self, id: ResourceId) -> Result<i64> {
        let mut txn = self.begin()?;
        let value = txn.read(id)?;
        txn.commit()?;
        Ok(value)
    }
}

/// One unit of work against a [`DurableStore`]
///
/// Row locks taken by `read_for_update`, `increment` or `write` are held until
/// `commit` or `rollback`. Dropping an unfinished transaction rolls it back.
pub trait StoreTransaction {
    /// Value visible to this transaction: its own staged write, else the last
    /// committed value. Does not lock.
    fn read(&mut self, id: ResourceId) -> Result<i64>;

    /// Lock the row for the rest of the transaction and return its value
    fn read_for_update(&mut self, id: ResourceId) -> Result<i64>;

    /// Lock the row and stage `value + 1`; returns the staged value
    fn increment(&mut self, id: ResourceId) -> Result<i64>;

    /// Lock the row and stage an unconditional overwrite
    fn write(&mut self, id: ResourceId, value: i64) -> Result<()>;

    /// Apply staged writes and release locks
    ///
    /// On failure the transaction is rolled back before the error is returned.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard staged writes and release locks
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Marker bound to a cache key at the moment it was watched
///
/// A conditional commit with the token succeeds only if the key's revision is
/// unchanged. The token is consumed by the commit attempt either way.
#[derive(Debug, PartialEq, Eq)]
pub struct WatchToken {
    key: CacheKey,
    revision: u64,
}

impl WatchToken {
    /// Create a token; for cache implementations
    pub fn new(key: CacheKey, revision: u64) -> Self {
        WatchToken { key, revision }
    }

    /// The watched key
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Key revision observed when the watch began
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Result of a conditional cache commit
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The value was written
    Committed(i64),
    /// The key changed since the watch began; nothing was written
    Conflict,
}

/// Single-threaded, externally atomic key-value cache
///
/// Each command is totally ordered with every other command. Sequences of
/// commands are not atomic unless they go through [`Cache::watch`] /
/// [`Cache::commit`].
pub trait Cache: Send + Sync {
    /// Current value, `None` on a miss
    fn get(&self, key: &CacheKey) -> Result<Option<i64>>;

    /// Unconditional write
    fn set(&self, key: &CacheKey, value: i64) -> Result<()>;

    /// Remove the key; returns whether it existed
    fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Atomic "+1"; a missing key counts as 0. Returns the new value.
    fn increment(&self, key: &CacheKey) -> Result<i64>;

    /// Whether the key currently holds a value
    fn exists(&self, key: &CacheKey) -> Result<bool>;

    /// Begin observing a key
    fn watch(&self, key: &CacheKey) -> Result<WatchToken>;

    /// Write `value` only if the watched key is unmodified since the watch
    fn commit(&self, token: WatchToken, value: i64) -> Result<CommitOutcome>;

    /// Watch `key`, compute a value from its current contents, and commit it
    /// conditionally
    fn watch_transaction(
        &self,
        key: &CacheKey,
        body: &mut dyn FnMut(Option<i64>) -> Result<i64>,
    ) -> Result<CommitOutcome> {
        let token = self.watch(key)?;
        let current = self.get(key)?;
        let value = body(current)?;
        self.commit(token, value)
    }
}
