//! Delay injection
//!
//! Every strategy calls [`DelayHook::pause`] at fixed points of its sequence.
//! The hook decides what happens there:
//!
//! | Hook | Behaviour |
//! |------|-----------|
//! | [`NoDelay`] | returns immediately |
//! | [`FixedDelay`] | sleeps at [`Phase::Processing`], the synthetic I/O pause |
//! | [`Rendezvous`] | parks the first N arrivals at a chosen point until released |
//!
//! `Rendezvous` makes interleavings deterministic: a test parks request A at a
//! point, runs request B to completion, then releases A.

use crate::strategy::StrategyKind;
use parking_lot::{Condvar, Mutex};
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tally_core::ResourceId;
use tracing::trace;

/// Where in a strategy the pause happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The synthetic processing delay each strategy defines
    Processing,
    /// Value to write has been captured, cache write not yet issued
    BeforeCacheWrite,
}

/// A single pause point reached by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPoint {
    /// Strategy being executed
    pub strategy: StrategyKind,
    /// Resource being incremented
    pub resource_id: ResourceId,
    /// Position within the strategy
    pub phase: Phase,
}

/// Pluggable pause hook
pub trait DelayHook: Send + Sync + Debug {
    /// Called by a strategy at `point`; may block
    fn pause(&self, point: &DelayPoint);
}

/// Never pauses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayHook for NoDelay {
    fn pause(&self, _point: &DelayPoint) {}
}

/// Sleeps for a fixed duration at [`Phase::Processing`]
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    duration: Duration,
}

impl FixedDelay {
    /// Create a fixed delay
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Create a fixed delay in milliseconds
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Configured pause
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl DelayHook for FixedDelay {
    fn pause(&self, point: &DelayPoint) {
        if point.phase == Phase::Processing && !self.duration.is_zero() {
            trace!(strategy = %point.strategy, resource_id = %point.resource_id, delay = ?self.duration, "injected delay");
            std::thread::sleep(self.duration);
        }
    }
}

#[derive(Debug)]
struct GateState {
    holds_left: usize,
    parked: usize,
    released: bool,
}

/// Test gate that parks requests at one phase until released
///
/// Only the first `holds` arrivals are parked; later arrivals pass straight
/// through, so a second request can run to completion while the first waits.
///
/// ```
/// use tally_concurrency::{Phase, Rendezvous};
///
/// let gate = Rendezvous::new(Phase::Processing, 1);
/// assert_eq!(gate.parked(), 0);
/// gate.release();
/// ```
#[derive(Debug)]
pub struct Rendezvous {
    phase: Phase,
    strategy: Option<StrategyKind>,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Rendezvous {
    /// Park the first `holds` arrivals at `phase`, for any strategy
    pub fn new(phase: Phase, holds: usize) -> Self {
        Self {
            phase,
            strategy: None,
            state: Mutex::new(GateState {
                holds_left: holds,
                parked: 0,
                released: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Only park requests running `strategy`
    pub fn for_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Requests currently parked
    pub fn parked(&self) -> usize {
        self.state.lock().parked
    }

    /// Block until at least `count` requests are parked
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_for_parked(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.parked < count {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.parked >= count;
            }
        }
        true
    }

    /// Let every parked request continue and stop parking new ones
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.released = true;
        self.changed.notify_all();
    }

    fn matches(&self, point: &DelayPoint) -> bool {
        point.phase == self.phase && self.strategy.map_or(true, |s| s == point.strategy)
    }
}

impl DelayHook for Rendezvous {
    fn pause(&self, point: &DelayPoint) {
        if !self.matches(point) {
            return;
        }
        let mut state = self.state.lock();
        if state.released || state.holds_left == 0 {
            return;
        }
        state.holds_left -= 1;
        state.parked += 1;
        trace!(strategy = %point.strategy, phase = ?point.phase, "parked at rendezvous");
        self.changed.notify_all();
        while !state.released {
            self.changed.wait(&mut state);
        }
        state.parked -= 1;
    }
}
