//! Volatile cache for tally
//!
//! This crate implements the cache side of the counter pair:
//! - MemoryCache: every command runs under one command lock, so commands are
//!   totally ordered the way a single-threaded cache server orders them
//! - Per-key revisions that back WATCH-style conditional commits
//! - Command counters (hits, misses, conflicts)
//! - Injectable failures for every command

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{CacheStats, MemoryCache};
