//! Mutual exclusion around the naive sequence
//!
//! The whole read-modify-write, delay included, runs while holding a lock
//! from the registry. With [`LockScope::Global`] every resource shares one
//! lock; with [`LockScope::PerResource`] only requests for the same resource
//! wait for each other. Either way the guard is released on every exit path.

use super::naive::read_modify_write;
use super::StrategyKind;
use crate::context::StrategyContext;
use crate::locks::LockScope;
use tally_core::{ResourceId, Result};
use tracing::trace;

pub(super) fn increment(
    ctx: &StrategyContext<'_>,
    kind: StrategyKind,
    scope: LockScope,
    id: ResourceId,
) -> Result<i64> {
    let _guard = ctx.locks.acquire(scope, id);
    trace!(strategy = %kind, resource_id = %id, ?scope, "lock acquired");
    read_modify_write(ctx, kind, id)
}
