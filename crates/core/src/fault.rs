//! Scripted failure injection
//!
//! A [`FaultPlan`] arms a number of failures for a given operation. Store and
//! cache implementations call [`FaultPlan::check`] at the top of each
//! operation; an armed point fails with the configured [`FaultKind`] and
//! disarms itself after the configured count.

use crate::error::{Component, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// Operation at which a failure can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Opening a store transaction
    StoreBegin,
    /// Store read (plain or for update)
    StoreRead,
    /// Store "+1"
    StoreIncrement,
    /// Store overwrite
    StoreWrite,
    /// Store commit
    StoreCommit,
    /// Cache get
    CacheGet,
    /// Cache set
    CacheSet,
    /// Cache delete
    CacheDelete,
    /// Cache increment
    CacheIncrement,
    /// Cache exists
    CacheExists,
    /// Cache watch
    CacheWatch,
    /// Cache conditional commit
    CacheCommit,
}

impl FaultPoint {
    /// Component the operation belongs to
    pub fn component(self) -> Component {
        match self {
            FaultPoint::StoreBegin
            | FaultPoint::StoreRead
            | FaultPoint::StoreIncrement
            | FaultPoint::StoreWrite
            | FaultPoint::StoreCommit => Component::Store,
            _ => Component::Cache,
        }
    }
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How an armed point fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Connectivity loss (`TransientUnavailable`)
    Transient,
    /// Unrecoverable failure (`Fatal`)
    Fatal,
}

/// Armed failures keyed by operation
#[derive(Debug, Default)]
pub struct FaultPlan {
    armed: Mutex<HashMap<FaultPoint, (FaultKind, u32)>>,
}

impl FaultPlan {
    /// Create a plan with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls at `point` with `kind`
    ///
    /// Re-arming a point replaces its previous setting.
    pub fn fail_next(&self, point: FaultPoint, kind: FaultKind, times: u32) {
        let mut armed = self.armed.lock();
        if times == 0 {
            armed.remove(&point);
        } else {
            armed.insert(point, (kind, times));
        }
    }

    /// Disarm every point
    pub fn clear(&self) {
        self.armed.lock().clear();
    }

    /// Remaining armed failures at `point`
    pub fn remaining(&self, point: FaultPoint) -> u32 {
        self.armed.lock().get(&point).map(|(_, n)| *n).unwrap_or(0)
    }

    /// Consume one armed failure at `point`, if any
    pub fn check(&self, point: FaultPoint) -> Result<()> {
        let mut armed = self.armed.lock();
        let Some((kind, remaining)) = armed.get_mut(&point) else {
            return Ok(());
        };
        let kind = *kind;
        *remaining -= 1;
        if *remaining == 0 {
            armed.remove(&point);
        }
        let message = format!("injected failure at {}", point);
        Err(match kind {
            FaultKind::Transient => Error::transient(point.component(), message),
            FaultKind::Fatal => Error::fatal(point.component(), message),
        })
    }
}
