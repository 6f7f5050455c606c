//! Cache-aside read

use crate::context::StrategyContext;
use tally_core::{ResourceId, Result};
use tracing::{debug, warn};

/// Current view count of `id`, served from the cache when present
///
/// On a miss the committed store value is returned and written back to the
/// cache. A failed backfill is logged and the store value is still returned,
/// since the cache is allowed to be empty.
pub fn read_view(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    let key = ctx.key(id);
    if let Some(value) = ctx.cache.get(&key)? {
        return Ok(value);
    }

    let value = ctx.store.read_committed(id)?;
    match ctx.cache.set(&key, value) {
        Ok(()) => debug!(resource_id = %id, value, "cache miss, backfilled"),
        Err(e) => warn!(resource_id = %id, error = %e, "cache backfill failed"),
    }
    Ok(value)
}
