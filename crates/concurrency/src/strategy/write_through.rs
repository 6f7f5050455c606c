//! Write-through strategies
//!
//! Both increment the store first and then bring the cache in line:
//!
//! - **overwrite**: re-read the store and `set` that value into the cache. The
//!   re-read is fresh, but the set is not ordered against other requests' sets,
//!   so an earlier request can land a smaller value after a later one.
//! - **invalidate**: `delete` the key. A delete carries no value, so there is
//!   nothing stale to write; the next cache-aside read repopulates the key.

use super::StrategyKind;
use crate::context::StrategyContext;
use crate::delay::Phase;
use tally_core::{Component, Error, ResourceId, Result};
use tracing::{debug, info};

pub(super) fn overwrite(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    const KIND: StrategyKind = StrategyKind::WriteThrough;
    let key = ctx.key(id);

    let committed = ctx.store.atomic_increment(id)?;
    debug!(resource_id = %id, committed, "store committed");

    ctx.pause(KIND, id, Phase::Processing);

    let current = ctx.store.read_committed(id)?;
    ctx.pause(KIND, id, Phase::BeforeCacheWrite);

    ctx.cache
        .set(&key, current)
        .map_err(|e| Error::desync(id, Component::Store, e))?;
    info!(resource_id = %id, value = current, "store updated, cache set");
    Ok(current)
}

pub(super) fn invalidate(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    const KIND: StrategyKind = StrategyKind::WriteInvalidate;
    let key = ctx.key(id);

    let committed = ctx.store.atomic_increment(id)?;
    debug!(resource_id = %id, committed, "store committed");

    ctx.pause(KIND, id, Phase::Processing);

    let existed = ctx
        .cache
        .delete(&key)
        .map_err(|e| Error::desync(id, Component::Store, e))?;

    let current = ctx.store.read_committed(id)?;
    info!(resource_id = %id, value = current, existed, "store updated, cache invalidated");
    Ok(current)
}
