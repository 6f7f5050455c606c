//! Concurrency-control strategies for tally
//!
//! This crate implements the ways a counter increment can coordinate the
//! durable store and the cache:
//! - Strategies: naive, optimistic (watch/commit loop), double-checked init,
//!   atomic-only, global lock, per-resource lock, write-through overwrite,
//!   write-through invalidate
//! - LockRegistry: explicit global and per-resource locks, owned by the caller
//! - DelayHook: pause points keyed by strategy and phase
//! - RetryPolicy: bound on optimistic commit attempts
//! - CoordinationMetrics: request, conflict and desync counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod delay;
pub mod locks;
pub mod metrics;
pub mod read;
pub mod strategy;

pub use context::{RetryPolicy, StrategyContext, StrategySettings};
pub use delay::{DelayHook, DelayPoint, FixedDelay, NoDelay, Phase, Rendezvous};
pub use locks::{LockRegistry, LockScope, ResourceGuard};
pub use metrics::{CoordinationMetrics, MetricsSnapshot};
pub use read::read_view;
pub use strategy::{execute, StrategyKind};
