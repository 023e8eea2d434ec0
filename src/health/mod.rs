//! Node health tracking
//!
//! This module provides:
//! - Per-node consecutive-failure counts driven by up/down signals
//! - Linear backoff windows during which a node is skipped
//! - Millisecond clocks (real and manual) for the backoff arithmetic

mod clock;
mod tracker;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use tracker::{NodeHealthRecord, NodeHealthTracker, DEFAULT_BACKOFF_BASE_MS};
