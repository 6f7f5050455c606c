//! Core types and contracts for tally
//!
//! This crate defines what every other crate agrees on:
//! - [`ResourceId`] and [`CacheKey`]: addressing for one counter per resource
//! - [`Error`]: the failure taxonomy shared by stores, strategies and dispatch
//! - [`DurableStore`] / [`StoreTransaction`]: the transactional row store seam
//! - [`Cache`]: the single-threaded cache seam with watch-based commits
//! - [`FaultPlan`]: scripted failures for exercising rollback and desync paths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fault;
pub mod traits;
pub mod types;

pub use error::{Component, Error, Result};
pub use fault::{FaultKind, FaultPlan, FaultPoint};
pub use traits::{Cache, CommitOutcome, DurableStore, StoreTransaction, WatchToken};
pub use types::{CacheKey, ResourceId, DEFAULT_KEY_PREFIX};
