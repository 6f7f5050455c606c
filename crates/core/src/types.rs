//! Core types for counter addressing
//!
//! This module defines the identifiers used throughout the system:
//! - [`ResourceId`]: positive identifier of a counted resource (a post)
//! - [`CacheKey`]: the cache address that mirrors a resource's counter

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Prefix used for cache keys when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "post";

/// Identifier of a counted resource
///
/// The durable store keys its rows by `ResourceId`, and the cache key is
/// derived from it. Zero is not a valid id.
///
/// # Examples
///
/// ```
/// use tally_core::ResourceId;
///
/// let id = ResourceId::new(1).unwrap();
/// assert_eq!(id.get(), 1);
/// assert!(ResourceId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    /// Create a ResourceId, rejecting zero
    pub fn new(id: u64) -> Result<Self> {
        NonZeroU64::new(id)
            .map(ResourceId)
            .ok_or_else(|| Error::invalid_resource(id, "resource ids are positive"))
    }

    /// Get the raw numeric id
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for ResourceId {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self> {
        ResourceId::new(id)
    }
}

impl From<ResourceId> for u64 {
    fn from(id: ResourceId) -> Self {
        id.get()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::invalid_resource(0, format!("'{}' is not an id: {}", s, e)))?;
        ResourceId::new(id)
    }
}

/// Cache address of a resource's counter
///
/// Keys follow the `{prefix}:{id}:view_count` layout, e.g. `post:1:view_count`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key string
    pub fn new(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    /// Derive the view-count key for a resource
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_core::{CacheKey, ResourceId};
    ///
    /// let key = CacheKey::for_resource("post", ResourceId::new(7).unwrap());
    /// assert_eq!(key.as_str(), "post:7:view_count");
    /// ```
    pub fn for_resource(prefix: &str, id: ResourceId) -> Self {
        CacheKey(format!("{}:{}:view_count", prefix, id))
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        CacheKey::new(raw)
    }
}
