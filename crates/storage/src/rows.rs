//! Row storage for resource counters
//!
//! Replaces a SQL `content(id, view_count)` table with a DashMap of rows.
//!
//! # Design
//!
//! - DashMap: sharded map of resource id → row, lock-free lookups
//! - Row value: AtomicI64 holding the last committed counter
//! - Row lock: `Arc<Mutex<()>>`, taken by a transaction on first write and
//!   held until commit or rollback
//!
//! Readers load the committed value atomically and never wait for a writer,
//! which gives read-committed visibility. Writers serialize on the row lock,
//! so two increments of the same row can never both apply to the same base.

use crate::transaction::RowTransaction;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tally_core::{
    DurableStore, FaultPlan, FaultPoint, ResourceId, Result, StoreTransaction,
};

/// One counter row
#[derive(Debug)]
pub(crate) struct Row {
    /// Last committed value
    pub(crate) value: AtomicI64,
    /// Row lock, held by at most one transaction
    pub(crate) lock: Arc<Mutex<()>>,
}

impl Row {
    fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
            lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Snapshot of store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreMetrics {
    /// Commit version (one per committed transaction that wrote)
    pub version: u64,
    /// Committed transactions
    pub commits: u64,
    /// Rolled back transactions (explicit, failed commit, or dropped)
    pub rollbacks: u64,
    /// Number of rows
    pub rows: usize,
}

/// Transactional in-memory row store
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - `value()` / transaction reads: atomic load, never block
/// - transaction writes: take the row lock, other rows never contend
///
/// # Example
///
/// ```
/// use tally_core::{DurableStore, ResourceId};
/// use tally_storage::RowStore;
///
/// let id = ResourceId::new(1).unwrap();
/// let store = RowStore::with_rows([(id, 0)]);
/// assert_eq!(store.atomic_increment(id).unwrap(), 1);
/// assert_eq!(store.value(id), Some(1));
/// ```
pub struct RowStore {
    rows: DashMap<ResourceId, Arc<Row>>,
    /// Global commit version
    version: AtomicU64,
    /// Next transaction ID
    next_txn_id: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    faults: FaultPlan,
}

impl RowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            version: AtomicU64::new(0),
            next_txn_id: AtomicU64::new(1),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            faults: FaultPlan::new(),
        }
    }

    /// Create a store holding the given rows
    pub fn with_rows(rows: impl IntoIterator<Item = (ResourceId, i64)>) -> Self {
        let store = Self::new();
        for (id, value) in rows {
            store.insert_row(id, value);
        }
        store
    }

    /// Insert or overwrite a row outside of any transaction
    ///
    /// Waits for the row lock if a transaction currently holds it.
    pub fn insert_row(&self, id: ResourceId, value: i64) {
        let row = self
            .rows
            .entry(id)
            .or_insert_with(|| Arc::new(Row::new(value)))
            .value()
            .clone();
        let _guard = row.lock.lock();
        row.value.store(value, Ordering::Release);
        self.next_version();
    }

    /// Check if a row exists
    pub fn contains(&self, id: ResourceId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Last committed value of a row
    pub fn value(&self, id: ResourceId) -> Option<i64> {
        self.rows
            .get(&id)
            .map(|row| row.value.load(Ordering::Acquire))
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Current commit version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Failure plan consulted by every operation
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Snapshot of commit/rollback counters
    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            version: self.version(),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            rows: self.row_count(),
        }
    }

    /// Open a typed transaction
    pub fn begin_transaction(&self) -> Result<RowTransaction<'_>> {
        self.faults.check(FaultPoint::StoreBegin)?;
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        Ok(RowTransaction::new(self, txn_id))
    }

    pub(crate) fn row(&self, id: ResourceId) -> Option<Arc<Row>> {
        self.rows.get(&id).map(|row| Arc::clone(row.value()))
    }

    /// Increment version and return new value
    #[inline]
    pub(crate) fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("rows", &self.row_count())
            .field("version", &self.version())
            .finish()
    }
}

impl DurableStore for RowStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(self.begin_transaction()?))
    }
}
