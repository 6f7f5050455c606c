//! Unified error types for Tally.
//!
//! This module provides a clean error type that wraps internal errors
//! and presents a consistent interface to users.

use thiserror::Error;

/// All Tally errors.
///
/// This is the canonical error type for all Tally operations.
/// It provides a stable interface that hides internal error details.
#[derive(Debug, Error)]
pub enum Error {
    /// Request named an unknown or non-positive resource id
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// Durable store has no row for the resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Store or cache temporarily unreachable
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Store or cache failed; any open transaction was rolled back
    #[error("fatal: {0}")]
    Fatal(String),

    /// Optimistic commit lost a race
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic commit loop gave up
    #[error("retries exhausted after {attempts} attempts: {message}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Detail
        message: String,
    },

    /// Store and cache were left diverged
    #[error("store/cache desync: {0}")]
    Desync(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for Tally operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Conflicts, outages and exhausted retries may succeed when called again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict(_) | Error::Unavailable(_) | Error::Exhausted { .. }
        )
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if the request itself was invalid.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::InvalidResource(_))
    }

    /// Check if store and cache now disagree.
    pub fn is_desync(&self) -> bool {
        matches!(self, Error::Desync(_))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Fatal(_) | Error::Desync(_))
    }
}

// Convert from internal core errors
impl From<tally_core::Error> for Error {
    fn from(e: tally_core::Error) -> Self {
        use tally_core::Error as CoreError;
        let message = e.to_string();
        match e {
            CoreError::InvalidResource { .. } => Error::InvalidResource(message),
            CoreError::NotFound(_) => Error::NotFound(message),
            CoreError::TransientUnavailable { .. } => Error::Unavailable(message),
            CoreError::Fatal { .. } => Error::Fatal(message),
            CoreError::Conflict { .. } => Error::Conflict(message),
            CoreError::Exhausted { attempts, .. } => Error::Exhausted { attempts, message },
            CoreError::PartialWriteDesync { .. } => Error::Desync(message),
            CoreError::Config(msg) => Error::Config(msg),
        }
    }
}
