//! Endpoint selection for outgoing operations
//!
//! Picks a random entry of the cluster; if that entry's node is still in its
//! backoff window it is dropped from the candidate list and another pick is
//! made, until a usable node is found or the list runs out.

use std::sync::Arc;

use rand::Rng as _;
use tracing::debug;

use crate::error::{ClusterError, ClusterResult};
use crate::factory::ClientFactory;
use crate::health::{Clock, NodeHealthTracker};
use crate::metrics::metrics;
use crate::registry::{ClusterEntry, ClusterKey, ClusterRegistry};

/// Strategy for choosing an index into the remaining candidates
pub trait PickStrategy: Send + Sync {
    /// Pick an index in `0..len`; `len` is never zero
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random pick (default)
#[derive(Debug, Default)]
pub struct RandomPick;

impl PickStrategy for RandomPick {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always the first remaining candidate
#[derive(Debug, Default)]
pub struct FirstPick;

impl PickStrategy for FirstPick {
    fn pick(&self, _len: usize) -> usize {
        0
    }
}

/// Selects a client for a cluster, skipping nodes in backoff
pub struct Selector<F: ClientFactory> {
    registry: Arc<ClusterRegistry>,
    health: Arc<NodeHealthTracker>,
    factory: Arc<F>,
    clock: Arc<dyn Clock>,
    strategy: Box<dyn PickStrategy>,
}

impl<F: ClientFactory> Selector<F> {
    pub fn new(
        registry: Arc<ClusterRegistry>,
        health: Arc<NodeHealthTracker>,
        factory: Arc<F>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_strategy(registry, health, factory, clock, Box::new(RandomPick))
    }

    pub fn with_strategy(
        registry: Arc<ClusterRegistry>,
        health: Arc<NodeHealthTracker>,
        factory: Arc<F>,
        clock: Arc<dyn Clock>,
        strategy: Box<dyn PickStrategy>,
    ) -> Self {
        Self {
            registry,
            health,
            factory,
            clock,
            strategy,
        }
    }

    /// Select a client for `cluster_key`
    ///
    /// # Errors
    /// - `ClusterNotConfigured` if the cluster has no entries
    /// - `NoNodeAvailable` if every entry's node is in backoff (the factory
    ///   is not called in that case)
    /// - `Factory` if the factory fails for the chosen endpoint
    pub fn select_client(&self, cluster_key: &ClusterKey) -> ClusterResult<F::Client> {
        let result = self.select_inner(cluster_key);
        match &result {
            Ok(_) => metrics().record_selection("ok"),
            Err(e) => metrics().record_selection(e.kind()),
        }
        result
    }

    /// Pick the entry that would be used, without calling the factory
    pub fn select_entry(&self, cluster_key: &ClusterKey) -> ClusterResult<ClusterEntry> {
        let entries = self.registry.get_entries(cluster_key)?;
        let now = self.clock.now_ms();

        // Healthy clusters resolve on the first pick without copying the list
        let idx = self.strategy.pick(entries.len());
        let picked = &entries[idx];
        if self.health.is_retry_due(picked.node(), now) {
            return Ok(picked.clone());
        }
        debug!(cluster = %cluster_key, node = %picked.node(), "Skipping node in backoff");

        let mut candidates: Vec<&ClusterEntry> = entries.iter().collect();
        candidates.swap_remove(idx);
        while !candidates.is_empty() {
            let idx = self.strategy.pick(candidates.len());
            let picked = candidates[idx];
            if self.health.is_retry_due(picked.node(), now) {
                return Ok(picked.clone());
            }
            debug!(cluster = %cluster_key, node = %picked.node(), "Skipping node in backoff");
            candidates.swap_remove(idx);
        }

        Err(ClusterError::NoNodeAvailable(cluster_key.clone()))
    }

    fn select_inner(&self, cluster_key: &ClusterKey) -> ClusterResult<F::Client> {
        let entry = self.select_entry(cluster_key)?;
        debug!(cluster = %cluster_key, node = %entry.node(), "Selected endpoint");
        let client = self
            .factory
            .get_client(&entry.client_key.node, &entry.client_key.options)?;
        Ok(client)
    }
}
