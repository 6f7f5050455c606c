//! Main entry point for Tally.
//!
//! This module provides the `Tally` struct, the primary entry point for
//! incrementing and inspecting counters.

use crate::error::{Error, Result};
use crate::types::{
    CachePriming, CacheStats, CounterSnapshot, DelayHook, LockScope, MetricsSnapshot, Response,
    StoreMetrics, StrategyKind, TallyConfig, TrialReport,
};
use std::path::Path;
use std::sync::Arc;
use tally_cache::MemoryCache;
use tally_core::ResourceId;
use tally_engine::{Dispatcher, LoadTest};
use tally_storage::RowStore;

/// A view counter held in a transactional store and mirrored in a cache.
///
/// Every increment runs one concurrency strategy against both. Create an
/// instance with [`Tally::ephemeral`], [`Tally::from_config`] or
/// [`Tally::builder`].
///
/// # Example
///
/// ```
/// use tallydb::prelude::*;
///
/// let tally = Tally::builder()
///     .strategy(StrategyKind::Optimistic)
///     .delay_ms(0)
///     .open()?;
///
/// assert_eq!(tally.increment(1)?, 1);
/// assert_eq!(tally.read_view(1)?, 1);
/// assert!(tally.increment(2).unwrap_err().is_rejection());
/// # Ok::<(), tallydb::Error>(())
/// ```
pub struct Tally {
    dispatcher: Dispatcher,
    store: Arc<RowStore>,
    cache: Arc<MemoryCache>,
    config: TallyConfig,
}

impl Tally {
    /// Open with default settings.
    ///
    /// Resource 1 at 0, naive strategy, 50 ms delay.
    pub fn ephemeral() -> Result<Self> {
        Self::builder().open()
    }

    /// Open from a configuration value.
    pub fn from_config(config: TallyConfig) -> Result<Self> {
        Self::builder().config(config).open()
    }

    /// Open from a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(TallyConfig::load(path)?)
    }

    /// Create a builder.
    pub fn builder() -> TallyBuilder {
        TallyBuilder::new()
    }

    /// Increment `resource_id` with the configured strategy.
    ///
    /// Returns the value the strategy reports.
    pub fn increment(&self, resource_id: u64) -> Result<i64> {
        self.dispatcher.try_increment(resource_id).map_err(Error::from)
    }

    /// Increment `resource_id` with an explicit strategy.
    pub fn increment_with(&self, strategy: StrategyKind, resource_id: u64) -> Result<i64> {
        self.dispatcher
            .try_increment_with(strategy, resource_id)
            .map_err(Error::from)
    }

    /// Increment and return a wire-shaped response instead of an error.
    pub fn respond(&self, resource_id: u64) -> Response {
        self.dispatcher.increment(resource_id)
    }

    /// Cache-aside read; a miss is served from the store and backfilled.
    pub fn read_view(&self, resource_id: u64) -> Result<i64> {
        self.dispatcher.read_view(resource_id).map_err(Error::from)
    }

    /// Durable and cached value of a resource.
    pub fn snapshot(&self, resource_id: u64) -> Result<CounterSnapshot> {
        self.dispatcher.snapshot(resource_id).map_err(Error::from)
    }

    /// Re-prime the cache the way the configured strategy starts.
    pub fn prime(&self) -> Result<()> {
        self.prime_with(CachePriming::for_strategy(self.strategy()))
    }

    /// Re-prime the cache explicitly.
    pub fn prime_with(&self, priming: CachePriming) -> Result<()> {
        self.dispatcher.prime(priming).map_err(Error::from)
    }

    /// Run the configured load trial against the first resource.
    pub fn run_load(&self) -> Result<TrialReport> {
        let test = LoadTest::from_config(&self.config)?;
        test.run(&self.dispatcher).map_err(Error::from)
    }

    /// Configured strategy.
    pub fn strategy(&self) -> StrategyKind {
        self.dispatcher.strategy()
    }

    /// Effective configuration.
    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// The in-memory durable store, for inspection and fault injection.
    pub fn store(&self) -> &RowStore {
        &self.store
    }

    /// The in-memory cache, for inspection and fault injection.
    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    /// Strategy, store and cache counters.
    pub fn metrics(&self) -> TallyMetrics {
        TallyMetrics {
            coordination: self.dispatcher.metrics(),
            store: self.store.metrics(),
            cache: self.cache.stats(),
        }
    }
}

impl std::fmt::Debug for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tally")
            .field("dispatcher", &self.dispatcher)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Counters from every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyMetrics {
    /// Strategy invocations, conflicts and desyncs
    pub coordination: MetricsSnapshot,
    /// Durable store commits and rollbacks
    pub store: StoreMetrics,
    /// Cache commands
    pub cache: CacheStats,
}

/// Builder for [`Tally`].
///
/// Starts from [`TallyConfig::default`]; each setter overrides one field.
///
/// # Example
///
/// ```
/// use tallydb::prelude::*;
///
/// let tally = Tally::builder()
///     .resources([1, 2, 3])
///     .seed(100)
///     .strategy(StrategyKind::ResourceLock)
///     .delay_ms(0)
///     .open()?;
///
/// assert_eq!(tally.increment(3)?, 101);
/// # Ok::<(), tallydb::Error>(())
/// ```
pub struct TallyBuilder {
    config: TallyConfig,
    resources: Option<Vec<u64>>,
    delay: Option<Arc<dyn DelayHook>>,
}

impl TallyBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: TallyConfig::default(),
            resources: None,
            delay: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TallyConfig) -> Self {
        self.config = config;
        self
    }

    /// Strategy every increment uses.
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy.kind = strategy;
        self
    }

    /// Known resource ids.
    pub fn resources(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.resources = Some(ids.into_iter().collect());
        self
    }

    /// Initial counter value of every resource.
    pub fn seed(mut self, seed: i64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Fixed processing delay.
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.strategy.delay_ms = delay_ms;
        self
    }

    /// Custom pause hook; replaces the fixed delay.
    pub fn delay_hook(mut self, hook: Arc<dyn DelayHook>) -> Self {
        self.delay = Some(hook);
        self
    }

    /// Bound on optimistic commit attempts.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.strategy.max_attempts = Some(max_attempts);
        self
    }

    /// Granularity of the double-checked init lock.
    pub fn init_lock(mut self, scope: LockScope) -> Self {
        self.config.strategy.init_lock = scope;
        self
    }

    /// Prefix of derived cache keys.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cache.key_prefix = prefix.into();
        self
    }

    /// Shape of [`Tally::run_load`].
    pub fn load(mut self, threads: usize, calls_per_thread: usize) -> Self {
        self.config.load.threads = threads;
        self.config.load.calls_per_thread = calls_per_thread;
        self
    }

    /// Validate, create the store and cache, and prime the cache.
    pub fn open(self) -> Result<Tally> {
        let mut config = self.config;
        if let Some(ids) = self.resources {
            config.resources = ids
                .into_iter()
                .map(ResourceId::new)
                .collect::<tally_core::Result<_>>()?;
        }
        config.validate()?;

        let store = Arc::new(RowStore::with_rows(
            config.resources.iter().map(|&id| (id, config.seed)),
        ));
        let cache = Arc::new(MemoryCache::new());

        let mut builder = tally_engine::DispatcherBuilder::from_config(&config)
            .store(store.clone())
            .cache(cache.clone());
        if let Some(hook) = self.delay {
            builder = builder.delay(hook);
        }
        let dispatcher = builder.build()?;
        dispatcher.prime(CachePriming::for_strategy(dispatcher.strategy()))?;

        tracing::info!(
            strategy = %dispatcher.strategy(),
            resources = config.resources.len(),
            seed = config.seed,
            "tally opened"
        );
        Ok(Tally {
            dispatcher,
            store,
            cache,
            config,
        })
    }
}

impl Default for TallyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
