//! Convenient imports for Tally.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```
//! use tallydb::prelude::*;
//!
//! let tally = Tally::builder().delay_ms(0).open()?;
//! tally.increment(1)?;
//! # Ok::<(), tallydb::Error>(())
//! ```

// Main entry point
pub use crate::database::{Tally, TallyBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::types::{CounterSnapshot, ResourceId, Response, StrategyKind, TallyConfig};

// Tuning
pub use crate::types::{LockScope, Phase, Rendezvous};
