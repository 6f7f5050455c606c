//! Double-checked cache initialization followed by atomic increments
//!
//! The only non-atomic step is seeding a missing key from the store. That
//! step runs under the init lock and re-checks existence, so exactly one
//! request seeds the key; everyone else goes straight to `increment`.

use super::StrategyKind;
use crate::context::StrategyContext;
use crate::delay::Phase;
use tally_core::{Component, Error, ResourceId, Result};
use tracing::{debug, info};

const KIND: StrategyKind = StrategyKind::DoubleChecked;

pub(super) fn increment(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    let key = ctx.key(id);

    if !ctx.cache.exists(&key)? {
        let _guard = ctx.init_locks.acquire(ctx.settings.init_lock, id);
        if !ctx.cache.exists(&key)? {
            let seed = ctx.store.read_committed(id)?;
            ctx.cache.set(&key, seed)?;
            ctx.metrics.record_init_load();
            info!(resource_id = %id, seed, "cache initialized under init lock");
        }
    }

    let cached = ctx.cache.increment(&key)?;
    debug!(resource_id = %id, cached, "cache incremented");

    let durable = ctx
        .store
        .atomic_increment(id)
        .map_err(|e| Error::desync(id, Component::Cache, e))?;
    debug!(resource_id = %id, durable, "store incremented");

    ctx.pause(KIND, id, Phase::Processing);
    Ok(cached)
}
