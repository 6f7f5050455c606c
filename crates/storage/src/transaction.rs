//! Row-store transactions
//!
//! A [`RowTransaction`] stages writes against locked rows and applies them on
//! commit.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. check injected commit failure → rollback and return Fatal
//! 2. allocate commit version (only if something was written)
//! 3. store staged values into the rows
//! 4. release row locks
//! 5. mark Committed
//! ```
//!
//! A transaction that is dropped while still active is rolled back, so an
//! early `?` return in a caller never leaves a row locked or half-applied.

use crate::rows::{Row, RowStore};
use parking_lot::{ArcMutexGuard, RawMutex};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tally_core::{Component, Error, FaultPoint, ResourceId, Result, StoreTransaction};
use tracing::{debug, warn};

/// Transaction lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Staged writes applied
    Committed,
    /// Staged writes discarded
    Aborted {
        /// Why the transaction was rolled back
        reason: String,
    },
}

/// A row locked by this transaction, with its staged value
struct LockedRow {
    row: Arc<Row>,
    pending: i64,
    _guard: ArcMutexGuard<RawMutex, ()>,
}

/// Unit of work against a [`RowStore`]
pub struct RowTransaction<'a> {
    store: &'a RowStore,
    txn_id: u64,
    locked: FxHashMap<ResourceId, LockedRow>,
    status: TransactionStatus,
}

impl<'a> RowTransaction<'a> {
    pub(crate) fn new(store: &'a RowStore, txn_id: u64) -> Self {
        Self {
            store,
            txn_id,
            locked: FxHashMap::default(),
            status: TransactionStatus::Active,
        }
    }

    /// Transaction identifier, unique within the store
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Current lifecycle state
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Rows currently locked by this transaction
    pub fn locked_rows(&self) -> usize {
        self.locked.len()
    }

    /// Lock `id` if this transaction does not hold it yet
    ///
    /// Blocks while another transaction holds the row.
    fn lock_row(&mut self, id: ResourceId) -> Result<&mut LockedRow> {
        let store = self.store;
        match self.locked.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let row = store.row(id).ok_or(Error::NotFound(id))?;
                let guard = row.lock.lock_arc();
                let pending = row.value.load(Ordering::Acquire);
                Ok(entry.insert(LockedRow {
                    row,
                    pending,
                    _guard: guard,
                }))
            }
        }
    }

    fn abort(&mut self, reason: String) {
        let released = self.locked.len();
        self.locked.clear();
        self.store.record_rollback();
        debug!(
            txn_id = self.txn_id,
            released_rows = released,
            reason = %reason,
            "transaction rolled back"
        );
        self.status = TransactionStatus::Aborted { reason };
    }
}

impl StoreTransaction for RowTransaction<'_> {
    fn read(&mut self, id: ResourceId) -> Result<i64> {
        self.store.faults().check(FaultPoint::StoreRead)?;
        if let Some(locked) = self.locked.get(&id) {
            return Ok(locked.pending);
        }
        self.store
            .row(id)
            .map(|row| row.value.load(Ordering::Acquire))
            .ok_or(Error::NotFound(id))
    }

    fn read_for_update(&mut self, id: ResourceId) -> Result<i64> {
        self.store.faults().check(FaultPoint::StoreRead)?;
        Ok(self.lock_row(id)?.pending)
    }

    fn increment(&mut self, id: ResourceId) -> Result<i64> {
        self.store.faults().check(FaultPoint::StoreIncrement)?;
        let locked = self.lock_row(id)?;
        locked.pending = locked
            .pending
            .checked_add(1)
            .ok_or_else(|| Error::fatal(Component::Store, format!("counter overflow on {}", id)))?;
        Ok(locked.pending)
    }

    fn write(&mut self, id: ResourceId, value: i64) -> Result<()> {
        self.store.faults().check(FaultPoint::StoreWrite)?;
        self.lock_row(id)?.pending = value;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        if let Err(e) = self.store.faults().check(FaultPoint::StoreCommit) {
            warn!(txn_id = self.txn_id, error = %e, "commit failed, rolling back");
            self.abort(format!("commit failed: {}", e));
            return Err(e);
        }

        if !self.locked.is_empty() {
            let version = self.store.next_version();
            for locked in self.locked.values() {
                locked.row.value.store(locked.pending, Ordering::Release);
            }
            debug!(
                txn_id = self.txn_id,
                version,
                rows = self.locked.len(),
                "transaction committed"
            );
        }

        // Dropping the guards releases the row locks.
        self.locked.clear();
        self.store.record_commit();
        self.status = TransactionStatus::Committed;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.abort("rolled back by caller".to_string());
        Ok(())
    }
}

impl Drop for RowTransaction<'_> {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            self.abort("dropped without commit".to_string());
        }
    }
}

impl std::fmt::Debug for RowTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowTransaction")
            .field("txn_id", &self.txn_id)
            .field("locked_rows", &self.locked.len())
            .field("status", &self.status)
            .finish()
    }
}
