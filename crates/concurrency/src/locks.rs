//! Lock registry for resource-scoped mutual exclusion
//!
//! One registry holds a process-wide lock and a lazily populated map of
//! per-resource locks. The registry is an ordinary value: whoever owns the
//! dispatcher owns the registry, and strategies borrow it per invocation.
//!
//! Per-resource locks live in a DashMap. The map entry is only held long
//! enough to clone the lock's `Arc`, so waiting for a busy resource never
//! blocks lookups of other resources.

use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, MutexGuard, RawMutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_core::ResourceId;

/// Granularity of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockScope {
    /// One lock shared by every resource
    Global,
    /// One lock per resource id
    #[default]
    PerResource,
}

/// Held lock; released on drop, whatever the exit path
#[must_use = "the lock is released as soon as the guard is dropped"]
pub enum ResourceGuard<'a> {
    /// Guard of the process-wide lock
    Global(MutexGuard<'a, ()>),
    /// Guard of one resource's lock
    Resource(ArcMutexGuard<RawMutex, ()>),
}

impl std::fmt::Debug for ResourceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceGuard::Global(_) => f.write_str("ResourceGuard::Global"),
            ResourceGuard::Resource(_) => f.write_str("ResourceGuard::Resource"),
        }
    }
}

/// Global and per-resource locks
#[derive(Debug, Default)]
pub struct LockRegistry {
    global: Mutex<()>,
    resources: DashMap<ResourceId, Arc<Mutex<()>>>,
}

impl LockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `scope` is held
    pub fn acquire(&self, scope: LockScope, id: ResourceId) -> ResourceGuard<'_> {
        match scope {
            LockScope::Global => ResourceGuard::Global(self.global.lock()),
            LockScope::PerResource => ResourceGuard::Resource(self.resource_lock(id).lock_arc()),
        }
    }

    /// Number of per-resource locks created so far
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn resource_lock(&self, id: ResourceId) -> Arc<Mutex<()>> {
        self.resources.entry(id).or_default().value().clone()
    }
}
