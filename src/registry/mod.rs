//! Cluster membership registry
//!
//! This module provides:
//! - Endpoint identity types (node address + connection options)
//! - The per-cluster endpoint store with structural dedup
//! - Copy-on-write snapshots for lock-free-style reads

mod entry;
mod store;

pub use entry::{ClientKey, ClusterEntry, ClusterKey, ConnectionOptions, EntryStatus, OptionValue};
pub use store::{AddReport, ClusterRegistry, RegistryStats};
