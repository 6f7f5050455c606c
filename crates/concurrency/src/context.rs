//! Per-invocation strategy context
//!
//! A strategy owns nothing. Everything it touches is borrowed from the
//! dispatcher for the duration of one call through [`StrategyContext`].

use crate::delay::{DelayHook, DelayPoint, Phase};
use crate::locks::{LockRegistry, LockScope};
use crate::metrics::CoordinationMetrics;
use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tally_core::{Cache, CacheKey, DurableStore, ResourceId, DEFAULT_KEY_PREFIX};

/// Bound on optimistic commit attempts
///
/// Unbounded by default: the loop keeps retrying while other writers make
/// progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    /// Retry until the commit succeeds
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    /// Give up after `max_attempts` conditional commits
    pub fn with_max_attempts(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Configured bound, if any
    pub fn max_attempts(&self) -> Option<NonZeroU32> {
        self.max_attempts
    }

    /// Whether attempt number `attempt` (1-based) may run
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max.get())
    }
}

/// Tunables shared by all strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySettings {
    /// Prefix of derived cache keys
    pub key_prefix: String,
    /// Optimistic loop bound
    pub retry: RetryPolicy,
    /// Granularity of the double-checked init lock
    pub init_lock: LockScope,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retry: RetryPolicy::default(),
            init_lock: LockScope::default(),
        }
    }
}

/// Everything a strategy borrows for one invocation
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Durable counter store
    pub store: &'a dyn DurableStore,
    /// Volatile counter cache
    pub cache: &'a dyn Cache,
    /// Locks for the global and per-resource strategies
    pub locks: &'a LockRegistry,
    /// Locks guarding double-checked cache initialization
    pub init_locks: &'a LockRegistry,
    /// Pause hook
    pub delay: &'a dyn DelayHook,
    /// Tunables
    pub settings: &'a StrategySettings,
    /// Shared counters
    pub metrics: &'a CoordinationMetrics,
}

impl StrategyContext<'_> {
    /// Cache key mirroring resource `id`
    pub fn key(&self, id: ResourceId) -> CacheKey {
        CacheKey::for_resource(&self.settings.key_prefix, id)
    }

    pub(crate) fn pause(&self, strategy: StrategyKind, resource_id: ResourceId, phase: Phase) {
        self.delay.pause(&DelayPoint {
            strategy,
            resource_id,
            phase,
        });
    }
}

impl std::fmt::Debug for StrategyContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyContext")
            .field("delay", &self.delay)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
