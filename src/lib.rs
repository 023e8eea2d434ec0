//! Client-side cluster membership registry
//!
//! Tracks the configured endpoints of each logical cluster, keeps per-node
//! failure state from external up/down signals, and selects a usable
//! endpoint for each outgoing operation while skipping nodes that are
//! still inside their backoff window.
//!
//! ```text
//!  admin calls / health signals          request path
//!             │                               │
//!             ▼                               ▼
//!     ┌───────────────┐               ┌──────────────┐
//!     │ ClusterService│               │   Selector   │──► ClientFactory
//!     │ (single task) │               └──────┬───────┘
//!     └───┬───────┬───┘                      │ reads
//!         │       │            ┌─────────────┴─────────────┐
//!         ▼       ▼            ▼                           ▼
//!  ClusterRegistry   NodeHealthTracker ◄──────────── (shared Arc)
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod service;

pub use error::{ClusterError, ClusterResult};
pub use factory::{AddrClientFactory, ClientFactory, FactoryError, NodeAddr};
pub use health::{Clock, ManualClock, MonotonicClock, NodeHealthRecord, NodeHealthTracker};
pub use registry::{
    AddReport, ClientKey, ClusterEntry, ClusterKey, ClusterRegistry, ConnectionOptions,
    OptionValue,
};
pub use router::Selector;
pub use service::{ClusterHandle, ClusterService, HealthNotifier};
