//! Durable store for tally
//!
//! This crate implements the transactional row store with:
//! - RowStore: DashMap of rows, one integer counter per resource
//! - Row-level locks held from first write until commit/rollback
//! - Read-committed reads that never block on a writer
//! - Commit versioning with AtomicU64
//! - Injectable failures for begin/read/increment/write/commit

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rows;
pub mod transaction;

pub use rows::{RowStore, StoreMetrics};
pub use transaction::{RowTransaction, TransactionStatus};
