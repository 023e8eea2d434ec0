//! Cluster registry: cluster key -> configured endpoints
//!
//! Writes are serialized through a single mutex and publish a fresh
//! immutable snapshot per cluster. Reads clone the snapshot `Arc` out of a
//! sharded map and never touch the writer lock.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ClusterError, ClusterResult};
use crate::factory::ClientFactory;
use crate::metrics::metrics;

use super::entry::{ClientKey, ClusterEntry, ClusterKey, ConnectionOptions};

/// Published state of one cluster
#[derive(Debug)]
struct ClusterMembers {
    entries: Arc<[ClusterEntry]>,
    keys: HashSet<ClientKey>,
}

/// Outcome of an `add_nodes` call
///
/// The call always succeeds as a whole; per-endpoint failures are listed
/// here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct AddReport {
    /// Endpoints inserted by this call
    pub added: Vec<ClientKey>,
    /// Endpoints skipped because they were already registered
    pub duplicates: usize,
    /// Endpoints the factory could not materialize
    pub failed: Vec<ClusterError>,
}

impl AddReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry of configured endpoints per cluster
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    /// Cluster snapshots (cluster key -> members)
    clusters: DashMap<ClusterKey, Arc<ClusterMembers>>,
    /// Serializes writers so the dedup check and insert are one step
    writer: Mutex<()>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register endpoints under `cluster_key`
    ///
    /// Each endpoint gets `shared_options` merged on top of its own options.
    /// Endpoints already registered under the cluster are skipped. Every new
    /// endpoint is materialized through `factory` first and only inserted if
    /// that succeeds.
    pub fn add_nodes<F: ClientFactory>(
        &self,
        cluster_key: &ClusterKey,
        client_keys: &[ClientKey],
        shared_options: &ConnectionOptions,
        factory: &F,
    ) -> AddReport {
        let _guard = self.writer.lock();

        let current = self.clusters.get(cluster_key).map(|m| m.value().clone());
        let mut entries = current
            .as_ref()
            .map(|m| m.entries.to_vec())
            .unwrap_or_default();
        let mut keys = current.map(|m| m.keys.clone()).unwrap_or_default();

        let mut report = AddReport::default();
        for client_key in client_keys {
            let client_key = client_key.with_shared(shared_options);
            if keys.contains(&client_key) {
                report.duplicates += 1;
                debug!(cluster = %cluster_key, node = %client_key.node, "Endpoint already registered");
                continue;
            }

            match factory.get_client(&client_key.node, &client_key.options) {
                Ok(_) => {
                    keys.insert(client_key.clone());
                    entries.push(ClusterEntry::new(cluster_key.clone(), client_key.clone()));
                    metrics().record_endpoint_added();
                    report.added.push(client_key);
                }
                Err(e) => {
                    warn!(
                        cluster = %cluster_key,
                        node = %client_key.node,
                        error = %e,
                        "Failed to materialize endpoint"
                    );
                    metrics().record_materialization_failure();
                    report.failed.push(ClusterError::Materialization {
                        node: client_key.node,
                        source: e,
                    });
                }
            }
        }

        if !report.added.is_empty() {
            let total = entries.len();
            let members = ClusterMembers {
                entries: entries.into(),
                keys,
            };
            self.clusters.insert(cluster_key.clone(), Arc::new(members));
            info!(
                cluster = %cluster_key,
                added = report.added.len(),
                total = total,
                "Registered endpoints"
            );
        }

        report
    }

    /// Snapshot of the entries registered under `cluster_key`
    pub fn get_entries(&self, cluster_key: &ClusterKey) -> ClusterResult<Arc<[ClusterEntry]>> {
        self.clusters
            .get(cluster_key)
            .map(|m| m.entries.clone())
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| ClusterError::ClusterNotConfigured(cluster_key.clone()))
    }

    /// Whether `client_key` is registered under `cluster_key`
    pub fn contains(&self, cluster_key: &ClusterKey, client_key: &ClientKey) -> bool {
        self.clusters
            .get(cluster_key)
            .map(|m| m.keys.contains(client_key))
            .unwrap_or(false)
    }

    /// All configured cluster keys, sorted
    pub fn cluster_keys(&self) -> Vec<ClusterKey> {
        let mut keys: Vec<_> = self.clusters.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Total number of entries across all clusters
    pub fn len(&self) -> usize {
        self.clusters.iter().map(|r| r.value().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let mut nodes = HashSet::new();
        let mut endpoints = 0;
        for members in self.clusters.iter() {
            endpoints += members.entries.len();
            nodes.extend(members.entries.iter().map(|e| e.node().to_string()));
        }
        RegistryStats {
            clusters: self.clusters.len(),
            endpoints,
            nodes: nodes.len(),
        }
    }
}

/// Statistics about the cluster registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub clusters: usize,
    pub endpoints: usize,
    /// Distinct node addresses
    pub nodes: usize,
}
