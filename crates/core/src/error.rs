//! Error types for tally
//!
//! One taxonomy covers both stores, the strategies and the dispatcher:
//!
//! | Variant | Raised by | Caller-visible |
//! |---------|-----------|----------------|
//! | InvalidResource | dispatcher, id parsing | yes (rejected) |
//! | NotFound | durable store read | yes |
//! | TransientUnavailable | store or cache call | yes |
//! | Fatal | store commit / connection | yes |
//! | Conflict | cache watch commit | no, retried by the optimistic loop |
//! | Exhausted | optimistic loop bound | yes |
//! | PartialWriteDesync | second of two independent writes | yes |
//! | Config | configuration loading | yes |

use crate::types::{CacheKey, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The two independently written materializations of a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Transactional primary store
    Store,
    /// Volatile cache
    Cache,
}

impl Component {
    /// The other component of the pair
    pub fn other(self) -> Component {
        match self {
            Component::Store => Component::Cache,
            Component::Cache => Component::Store,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Store => f.write_str("durable store"),
            Component::Cache => f.write_str("cache"),
        }
    }
}

/// All tally errors
#[derive(Debug, Error)]
pub enum Error {
    /// Requested id is not a known resource; nothing was touched
    #[error("invalid resource {resource_id}: {reason}")]
    InvalidResource {
        /// The rejected raw id
        resource_id: u64,
        /// Why it was rejected
        reason: String,
    },

    /// Durable store has no row for the resource
    #[error("resource {0} not found in durable store")]
    NotFound(ResourceId),

    /// Connectivity failure; the call may succeed if retried
    #[error("{component} temporarily unavailable: {message}")]
    TransientUnavailable {
        /// Which store failed
        component: Component,
        /// Failure detail
        message: String,
    },

    /// Commit or connection failure; any open transaction was rolled back
    #[error("fatal {component} failure: {message}")]
    Fatal {
        /// Which store failed
        component: Component,
        /// Failure detail
        message: String,
    },

    /// Watched cache key changed between watch and commit
    ///
    /// The optimistic loop sees conflicts as [`CommitOutcome::Conflict`] and
    /// retries; nothing in this workspace returns this variant. It is kept
    /// for `Cache` implementations that report a lost watch as an error.
    ///
    /// [`CommitOutcome::Conflict`]: crate::CommitOutcome::Conflict
    #[error("watched key {key} was modified before commit")]
    Conflict {
        /// The contended key
        key: CacheKey,
    },

    /// Optimistic commit loop ran out of attempts
    #[error("optimistic commit on {key} gave up after {attempts} attempts")]
    Exhausted {
        /// The contended key
        key: CacheKey,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// One write of an independent store/cache pair committed, the other failed
    ///
    /// No reconciliation is attempted; the two materializations now differ.
    #[error(
        "resource {resource_id}: {committed} write committed but {} write failed: {source}",
        .committed.other()
    )]
    PartialWriteDesync {
        /// Affected resource
        resource_id: ResourceId,
        /// Component whose write had already committed
        committed: Component,
        /// Failure of the second write
        source: Box<Error>,
    },

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for tally operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::InvalidResource`]
    pub fn invalid_resource(resource_id: u64, reason: impl Into<String>) -> Self {
        Error::InvalidResource {
            resource_id,
            reason: reason.into(),
        }
    }

    /// Build an [`Error::TransientUnavailable`]
    pub fn transient(component: Component, message: impl Into<String>) -> Self {
        Error::TransientUnavailable {
            component,
            message: message.into(),
        }
    }

    /// Build an [`Error::Fatal`]
    pub fn fatal(component: Component, message: impl Into<String>) -> Self {
        Error::Fatal {
            component,
            message: message.into(),
        }
    }

    /// Wrap the failure of a second write after `committed` already succeeded
    pub fn desync(resource_id: ResourceId, committed: Component, source: Error) -> Self {
        Error::PartialWriteDesync {
            resource_id,
            committed,
            source: Box::new(source),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Conflicts, transient outages and exhausted optimistic loops may
    /// succeed on retry with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict { .. }
                | Error::TransientUnavailable { .. }
                | Error::Exhausted { .. }
        )
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if the caller sent a bad request rather than the system failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::InvalidResource { .. })
    }

    /// Check if the store and cache were left diverged.
    pub fn is_desync(&self) -> bool {
        matches!(self, Error::PartialWriteDesync { .. })
    }

    /// Short stable code for logs and wire responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidResource { .. } => "InvalidResource",
            Error::NotFound(_) => "NotFound",
            Error::TransientUnavailable { .. } => "TransientUnavailable",
            Error::Fatal { .. } => "Fatal",
            Error::Conflict { .. } => "Conflict",
            Error::Exhausted { .. } => "Exhausted",
            Error::PartialWriteDesync { .. } => "PartialWriteDesync",
            Error::Config(_) => "Config",
        }
    }
}
