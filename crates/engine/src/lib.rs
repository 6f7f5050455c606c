//! Request handling for tally
//!
//! This crate wires stores, cache and strategies together:
//! - TallyConfig: TOML configuration with defaults and validation
//! - Dispatcher: validates ids, runs one strategy per request, maps outcomes
//!   to wire responses
//! - LoadTest / compare: concurrent load trials and per-strategy reports

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod harness;

pub use config::{CacheConfig, LoadConfig, StrategyConfig, TallyConfig};
pub use dispatcher::{CachePriming, CounterSnapshot, Dispatcher, DispatcherBuilder, Response};
pub use harness::{compare, LoadTest, TrialReport};
