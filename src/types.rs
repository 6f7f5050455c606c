//! Public types for the Tally API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// Addressing
pub use tally_core::{CacheKey, ResourceId, DEFAULT_KEY_PREFIX};

// Strategy selection and tuning
pub use tally_concurrency::{LockScope, RetryPolicy, StrategyKind};

// Delay injection
pub use tally_concurrency::{DelayHook, DelayPoint, FixedDelay, NoDelay, Phase, Rendezvous};

// Responses, snapshots and reports
pub use tally_engine::{CachePriming, CounterSnapshot, Response, TrialReport};

// Configuration
pub use tally_engine::{CacheConfig, LoadConfig, StrategyConfig, TallyConfig};

// Metrics
pub use tally_cache::CacheStats;
pub use tally_concurrency::MetricsSnapshot;
pub use tally_storage::StoreMetrics;

// Fault injection
pub use tally_core::{Component, FaultKind, FaultPoint};
