//! Configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! resources = [1]
//! seed = 0
//!
//! [cache]
//! key_prefix = "post"
//!
//! [strategy]
//! kind = "naive"
//! delay_ms = 50
//! # max_attempts = 100
//! init_lock = "per-resource"
//!
//! [load]
//! threads = 50
//! calls_per_thread = 100
//! ```

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use tally_concurrency::{LockScope, RetryPolicy, StrategyKind, StrategySettings};
use tally_core::{Error, ResourceId, Result, DEFAULT_KEY_PREFIX};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Resources that exist; any other id is rejected
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceId>,

    /// Initial counter value of every resource
    #[serde(default)]
    pub seed: i64,

    /// Cache addressing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Strategy selection and tuning
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Load harness shape
    #[serde(default)]
    pub load: LoadConfig,
}

/// Cache addressing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Keys are `{key_prefix}:{id}:view_count`
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Strategy selection and tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Strategy every request uses
    #[serde(default = "default_kind")]
    pub kind: StrategyKind,

    /// Injected processing delay in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Bound on optimistic commit attempts; unbounded when absent
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Granularity of the double-checked init lock
    #[serde(default)]
    pub init_lock: LockScope,
}

/// Load harness shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Concurrent callers
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Increments issued by each caller
    #[serde(default = "default_calls_per_thread")]
    pub calls_per_thread: usize,
}

fn default_resources() -> Vec<ResourceId> {
    ResourceId::new(1).map(|id| vec![id]).unwrap_or_default()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_kind() -> StrategyKind {
    StrategyKind::Naive
}

fn default_delay_ms() -> u64 {
    50
}

fn default_threads() -> usize {
    50
}

fn default_calls_per_thread() -> usize {
    100
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            seed: 0,
            cache: CacheConfig::default(),
            strategy: StrategyConfig::default(),
            load: LoadConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            delay_ms: default_delay_ms(),
            max_attempts: None,
            init_lock: LockScope::default(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            calls_per_thread: default_calls_per_thread(),
        }
    }
}

impl TallyConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TallyConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Err(Error::Config("at least one resource is required".into()));
        }
        let mut sorted = self.resources.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::Config(format!("duplicate resource {}", pair[0])));
        }
        if self.cache.key_prefix.is_empty() {
            return Err(Error::Config("cache.key_prefix must not be empty".into()));
        }
        if self.strategy.max_attempts == Some(0) {
            return Err(Error::Config("strategy.max_attempts must be positive".into()));
        }
        if self.load.threads == 0 {
            return Err(Error::Config("load.threads must be positive".into()));
        }
        if self.load.calls_per_thread == 0 {
            return Err(Error::Config("load.calls_per_thread must be positive".into()));
        }
        Ok(())
    }

    /// Injected delay as a duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.strategy.delay_ms)
    }

    /// Optimistic retry bound
    pub fn retry_policy(&self) -> RetryPolicy {
        self.strategy
            .max_attempts
            .and_then(NonZeroU32::new)
            .map_or_else(RetryPolicy::unbounded, RetryPolicy::with_max_attempts)
    }

    /// Settings handed to every strategy invocation
    pub fn strategy_settings(&self) -> StrategySettings {
        StrategySettings {
            key_prefix: self.cache.key_prefix.clone(),
            retry: self.retry_policy(),
            init_lock: self.strategy.init_lock,
        }
    }
}
