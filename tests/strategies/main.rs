//! Strategy Integration Tests
//!
//! Concurrent increments through the public API: which strategies keep the
//! cache equal to the store, and which lose updates.

mod common;

mod coherence;
mod dispatcher;
mod faults;
mod naive;
mod optimistic;
mod scenario;
mod write_through;
