//! Request dispatcher
//!
//! The dispatcher is the request boundary. It owns the lock registries, the
//! delay hook and the metrics, validates the requested id, runs exactly one
//! strategy, and turns the outcome into a [`Response`].

use crate::config::TallyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tally_cache::MemoryCache;
use tally_concurrency::{
    execute, CoordinationMetrics, DelayHook, FixedDelay, LockRegistry, MetricsSnapshot,
    StrategyContext, StrategyKind, StrategySettings,
};
use tally_core::{Cache, DurableStore, Error, ResourceId, Result};
use tally_storage::RowStore;
use tracing::{debug, error, info, warn};

/// Outcome of one increment request, shaped for the wire
///
/// ```
/// use tally_engine::Response;
///
/// let ok = Response::Success { resource_id: 1, reported_count: 3 };
/// assert_eq!(ok.status_code(), 200);
/// assert!(ok.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// The increment was applied
    Success {
        /// Requested resource
        #[serde(rename = "post_id")]
        resource_id: u64,
        /// Value the strategy reported
        #[serde(rename = "final_view_count_reported")]
        reported_count: i64,
    },
    /// The request named an unknown resource; nothing was touched
    Rejected {
        /// Reason
        error: String,
    },
    /// The increment failed; the durable store was rolled back
    Failed {
        /// Reason
        error: String,
    },
}

impl Response {
    /// HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            Response::Success { .. } => 200,
            Response::Rejected { .. } => 400,
            Response::Failed { .. } => 500,
        }
    }

    /// Whether the increment was applied
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

/// How to prepare the cache before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePriming {
    /// Copy each resource's durable value into the cache
    Seed,
    /// Remove each resource's key
    Clear,
}

impl CachePriming {
    /// Priming each strategy starts from
    ///
    /// Double-checked init is exercised from an empty cache; every other
    /// strategy starts with the cache equal to the store.
    pub fn for_strategy(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::DoubleChecked => CachePriming::Clear,
            _ => CachePriming::Seed,
        }
    }
}

/// Both materializations of one counter at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Resource the values belong to
    pub resource_id: ResourceId,
    /// Committed durable value
    pub durable: i64,
    /// Cached value, absent on a miss
    pub cached: Option<i64>,
}

impl CounterSnapshot {
    /// Cache agrees with the store, or holds nothing
    pub fn is_coherent(&self) -> bool {
        self.cached.map_or(true, |cached| cached == self.durable)
    }
}

/// Routes increment requests to a strategy
pub struct Dispatcher {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn Cache>,
    resources: BTreeSet<ResourceId>,
    strategy: StrategyKind,
    settings: StrategySettings,
    delay: Arc<dyn DelayHook>,
    locks: LockRegistry,
    init_locks: LockRegistry,
    metrics: CoordinationMetrics,
}

impl Dispatcher {
    /// Create a builder
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Build an in-memory dispatcher from configuration
    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        DispatcherBuilder::from_config(config).build()
    }

    /// Strategy used by [`Dispatcher::increment`]
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Known resources, ascending
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().copied()
    }

    /// The durable store
    pub fn store(&self) -> &dyn DurableStore {
        self.store.as_ref()
    }

    /// The cache
    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Resolve a raw id to a known resource
    pub fn validate(&self, raw: u64) -> Result<ResourceId> {
        let id = ResourceId::new(raw)?;
        if self.resources.contains(&id) {
            Ok(id)
        } else {
            Err(Error::invalid_resource(raw, "unknown resource"))
        }
    }

    /// Increment with the configured strategy
    pub fn try_increment(&self, raw: u64) -> Result<i64> {
        self.try_increment_with(self.strategy, raw)
    }

    /// Increment with an explicit strategy
    pub fn try_increment_with(&self, kind: StrategyKind, raw: u64) -> Result<i64> {
        let id = self.validate(raw).map_err(|e| {
            warn!(strategy = %kind, resource_id = raw, error = %e, "request rejected");
            e
        })?;

        match execute(kind, &self.context(), id) {
            Ok(value) => {
                info!(strategy = %kind, resource_id = %id, value, "view count incremented");
                Ok(value)
            }
            Err(e) => {
                error!(strategy = %kind, resource_id = %id, code = e.code(), error = %e, "increment failed");
                Err(e)
            }
        }
    }

    /// Increment with the configured strategy and shape the outcome
    pub fn increment(&self, raw: u64) -> Response {
        self.increment_with(self.strategy, raw)
    }

    /// Increment with an explicit strategy and shape the outcome
    pub fn increment_with(&self, kind: StrategyKind, raw: u64) -> Response {
        match self.try_increment_with(kind, raw) {
            Ok(reported_count) => Response::Success {
                resource_id: raw,
                reported_count,
            },
            Err(e) if e.is_rejection() => Response::Rejected {
                error: e.to_string(),
            },
            Err(e) => Response::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Cache-aside read of a resource's view count
    pub fn read_view(&self, raw: u64) -> Result<i64> {
        let id = self.validate(raw)?;
        tally_concurrency::read_view(&self.context(), id)
    }

    /// Prepare the cache for every known resource
    pub fn prime(&self, priming: CachePriming) -> Result<()> {
        for id in self.resources() {
            let key = self.context().key(id);
            match priming {
                CachePriming::Seed => {
                    let value = self.store.read_committed(id)?;
                    self.cache.set(&key, value)?;
                }
                CachePriming::Clear => {
                    self.cache.delete(&key)?;
                }
            }
        }
        debug!(strategy = %self.strategy, ?priming, "cache primed");
        Ok(())
    }

    /// Read both materializations of a resource
    pub fn snapshot(&self, raw: u64) -> Result<CounterSnapshot> {
        let id = self.validate(raw)?;
        Ok(CounterSnapshot {
            resource_id: id,
            durable: self.store.read_committed(id)?,
            cached: self.cache.get(&self.context().key(id))?,
        })
    }

    /// Strategy counters so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn context(&self) -> StrategyContext<'_> {
        StrategyContext {
            store: self.store.as_ref(),
            cache: self.cache.as_ref(),
            locks: &self.locks,
            init_locks: &self.init_locks,
            delay: self.delay.as_ref(),
            settings: &self.settings,
            metrics: &self.metrics,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("strategy", &self.strategy)
            .field("resources", &self.resources)
            .field("settings", &self.settings)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`]
///
/// Without an explicit store, an in-memory [`RowStore`] is created holding
/// one row per resource at `seed`. Without an explicit cache, an empty
/// [`MemoryCache`] is used.
pub struct DispatcherBuilder {
    store: Option<Arc<dyn DurableStore>>,
    cache: Option<Arc<dyn Cache>>,
    resources: Vec<ResourceId>,
    seed: i64,
    strategy: StrategyKind,
    settings: StrategySettings,
    delay: Arc<dyn DelayHook>,
}

impl DispatcherBuilder {
    /// Defaults of [`TallyConfig`]
    pub fn new() -> Self {
        Self::from_config(&TallyConfig::default())
    }

    /// Start from a configuration
    pub fn from_config(config: &TallyConfig) -> Self {
        Self {
            store: None,
            cache: None,
            resources: config.resources.clone(),
            seed: config.seed,
            strategy: config.strategy.kind,
            settings: config.strategy_settings(),
            delay: Arc::new(FixedDelay::new(config.delay())),
        }
    }

    /// Use an existing durable store
    pub fn store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an existing cache
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Known resources
    pub fn resources(mut self, resources: impl IntoIterator<Item = ResourceId>) -> Self {
        self.resources = resources.into_iter().collect();
        self
    }

    /// Initial value of rows in a store the builder creates
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Strategy for [`Dispatcher::increment`]
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Strategy tunables
    pub fn settings(mut self, settings: StrategySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pause hook
    pub fn delay(mut self, delay: Arc<dyn DelayHook>) -> Self {
        self.delay = delay;
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Result<Dispatcher> {
        if self.resources.is_empty() {
            return Err(Error::Config("at least one resource is required".into()));
        }
        let resources: BTreeSet<ResourceId> = self.resources.iter().copied().collect();
        let seed = self.seed;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(RowStore::with_rows(resources.iter().map(|&id| (id, seed)))),
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryCache::new()),
        };

        debug!(strategy = %self.strategy, resources = resources.len(), "dispatcher built");
        Ok(Dispatcher {
            store,
            cache,
            resources,
            strategy: self.strategy,
            settings: self.settings,
            delay: self.delay,
            locks: LockRegistry::new(),
            init_locks: LockRegistry::new(),
            metrics: CoordinationMetrics::new(),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
