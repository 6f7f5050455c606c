//! # Tally
//!
//! A view counter kept in two places at once: a transactional durable store
//! and a fast volatile cache. Many callers increment it concurrently, and a
//! processing delay between the two writes widens every race.
//!
//! Tally runs each increment through one of eight concurrency strategies and
//! shows which of them keep the cache equal to the store and which lose
//! updates.
//!
//! ## Quick Start
//!
//! ```
//! use tallydb::prelude::*;
//!
//! let tally = Tally::builder()
//!     .strategy(StrategyKind::Atomic)
//!     .delay_ms(0)
//!     .open()?;
//!
//! tally.increment(1)?;
//! let snapshot = tally.snapshot(1)?;
//! assert_eq!(snapshot.durable, 1);
//! assert_eq!(snapshot.cached, Some(1));
//! # Ok::<(), tallydb::Error>(())
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Cache coherent under contention |
//! |----------|---------------------------------|
//! | `naive` | no |
//! | `optimistic` | yes |
//! | `double-checked` | yes |
//! | `atomic` | yes |
//! | `global-lock` | yes |
//! | `resource-lock` | yes |
//! | `write-through` | no |
//! | `write-invalidate` | yes (key left absent) |

#![warn(missing_docs)]

mod database;
mod error;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{Tally, TallyBuilder, TallyMetrics};
pub use error::{Error, Result};

// Re-export types
pub use types::*;
