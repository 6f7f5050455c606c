//! Naive read-modify-write
//!
//! ```text
//! 1. read cache (miss: read store, backfill cache)
//! 2. new = read + 1
//! 3. store increment + commit
//! 4. delay
//! 5. cache set(new)
//! ```
//!
//! Two requests that read the same cached value in step 1 both write the same
//! `new` in step 5. The store is incremented twice, the cache once.

use super::{overflow, StrategyKind};
use crate::context::StrategyContext;
use crate::delay::Phase;
use tally_core::{Component, Error, ResourceId, Result};
use tracing::debug;

pub(super) fn increment(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    read_modify_write(ctx, StrategyKind::Naive, id)
}

/// The unguarded sequence, also run by the lock strategies inside their
/// critical section
pub(super) fn read_modify_write(
    ctx: &StrategyContext<'_>,
    kind: StrategyKind,
    id: ResourceId,
) -> Result<i64> {
    let key = ctx.key(id);

    let read = match ctx.cache.get(&key)? {
        Some(value) => {
            debug!(strategy = %kind, resource_id = %id, value, "step 1: cache hit");
            value
        }
        None => {
            let value = ctx.store.read_committed(id)?;
            ctx.cache.set(&key, value)?;
            debug!(strategy = %kind, resource_id = %id, value, "step 1: cache miss, backfilled from store");
            value
        }
    };

    let new = read.checked_add(1).ok_or_else(|| overflow(id))?;
    debug!(strategy = %kind, resource_id = %id, read, new, "step 2: computed");

    let durable = ctx.store.atomic_increment(id)?;
    debug!(strategy = %kind, resource_id = %id, durable, "step 3: store committed");

    ctx.pause(kind, id, Phase::Processing);
    ctx.pause(kind, id, Phase::BeforeCacheWrite);

    ctx.cache
        .set(&key, new)
        .map_err(|e| Error::desync(id, Component::Store, e))?;
    debug!(strategy = %kind, resource_id = %id, value = new, "step 5: cache written");

    Ok(new)
}
