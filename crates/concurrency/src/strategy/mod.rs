//! Increment strategies
//!
//! Each strategy takes a resource id and returns the counter value it
//! reports for that request. They differ in how the durable store write and
//! the cache write are coordinated:
//!
//! | Strategy | Cache write | Lost update possible |
//! |----------|-------------|----------------------|
//! | naive | unconditional set of a value read earlier | yes, in the cache |
//! | optimistic | watched conditional commit, retried | no |
//! | double-checked | atomic increment after a locked seed | no |
//! | atomic | atomic increment | no |
//! | global-lock | set, under one process-wide lock | no |
//! | resource-lock | set, under a per-resource lock | no |
//! | write-through | set of the re-read store value | yes, stale overwrite |
//! | write-invalidate | delete | no (key absent) |
//!
//! The store write is always a row-locked increment or an overwrite ordered by
//! a row lock, so the durable value never loses an update.

mod atomic;
mod double_checked;
mod mutex;
mod naive;
mod optimistic;
mod write_through;

use crate::context::StrategyContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tally_core::{Error, ResourceId, Result};
use tracing::{debug, warn};

/// Which coordination strategy a request uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Read the cache, increment the store, overwrite the cache
    Naive,
    /// Watch/commit loop on the cache, then write the store
    Optimistic,
    /// Locked cache seeding followed by atomic increments
    DoubleChecked,
    /// Atomic cache increment plus atomic store increment
    Atomic,
    /// Naive sequence under a process-wide lock
    GlobalLock,
    /// Naive sequence under a per-resource lock
    ResourceLock,
    /// Increment the store, copy its value into the cache
    WriteThrough,
    /// Increment the store, delete the cache key
    WriteInvalidate,
}

impl StrategyKind {
    /// Every strategy, in presentation order
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::Naive,
        StrategyKind::Optimistic,
        StrategyKind::DoubleChecked,
        StrategyKind::Atomic,
        StrategyKind::GlobalLock,
        StrategyKind::ResourceLock,
        StrategyKind::WriteThrough,
        StrategyKind::WriteInvalidate,
    ];

    /// Stable kebab-case name
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Naive => "naive",
            StrategyKind::Optimistic => "optimistic",
            StrategyKind::DoubleChecked => "double-checked",
            StrategyKind::Atomic => "atomic",
            StrategyKind::GlobalLock => "global-lock",
            StrategyKind::ResourceLock => "resource-lock",
            StrategyKind::WriteThrough => "write-through",
            StrategyKind::WriteInvalidate => "write-invalidate",
        }
    }

    /// Whether the cache ends equal to the store after concurrent increments
    ///
    /// `WriteInvalidate` counts as correct: it leaves the key absent, and the
    /// next cache-aside read repopulates it from the store.
    pub fn prevents_lost_updates(self) -> bool {
        !matches!(self, StrategyKind::Naive | StrategyKind::WriteThrough)
    }

    /// Whether the strategy leaves a populated cache behind
    pub fn keeps_cache_populated(self) -> bool {
        self != StrategyKind::WriteInvalidate
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown strategy: {}", s)))
    }
}

/// Run one increment of `id` with strategy `kind`
///
/// Returns the value the strategy reports. The durable store is always left
/// committed or rolled back when this returns.
pub fn execute(kind: StrategyKind, ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    ctx.metrics.record_request();
    debug!(strategy = %kind, resource_id = %id, "increment started");

    let result = match kind {
        StrategyKind::Naive => naive::increment(ctx, id),
        StrategyKind::Optimistic => optimistic::increment(ctx, id),
        StrategyKind::DoubleChecked => double_checked::increment(ctx, id),
        StrategyKind::Atomic => atomic::increment(ctx, id),
        StrategyKind::GlobalLock => mutex::increment(ctx, kind, crate::LockScope::Global, id),
        StrategyKind::ResourceLock => {
            mutex::increment(ctx, kind, crate::LockScope::PerResource, id)
        }
        StrategyKind::WriteThrough => write_through::overwrite(ctx, id),
        StrategyKind::WriteInvalidate => write_through::invalidate(ctx, id),
    };

    ctx.metrics.record_outcome(&result);
    match &result {
        Ok(value) => debug!(strategy = %kind, resource_id = %id, value, "increment finished"),
        Err(e) if e.is_desync() => {
            warn!(strategy = %kind, resource_id = %id, error = %e, "store and cache diverged")
        }
        Err(_) => {}
    }
    result
}

fn overflow(id: ResourceId) -> Error {
    Error::fatal(
        tally_core::Component::Cache,
        format!("counter for resource {} overflowed", id),
    )
}
