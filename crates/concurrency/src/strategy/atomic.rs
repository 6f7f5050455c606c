//! Atomic-only increments
//!
//! Cache `increment` and a row-locked store increment. Neither side reads a
//! value it later writes back, so there is nothing to lose. A missing key is
//! counted from 0, so the cache must be primed from the store beforehand for
//! the two sides to agree.

use super::StrategyKind;
use crate::context::StrategyContext;
use crate::delay::Phase;
use tally_core::{Component, Error, ResourceId, Result};
use tracing::debug;

const KIND: StrategyKind = StrategyKind::Atomic;

pub(super) fn increment(ctx: &StrategyContext<'_>, id: ResourceId) -> Result<i64> {
    let key = ctx.key(id);

    let cached = ctx.cache.increment(&key)?;
    let durable = ctx
        .store
        .atomic_increment(id)
        .map_err(|e| Error::desync(id, Component::Cache, e))?;
    debug!(resource_id = %id, cached, durable, "incremented");

    ctx.pause(KIND, id, Phase::Processing);
    Ok(cached)
}
