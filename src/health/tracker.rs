//! Per-node failure tracking with linear backoff
//!
//! A node has a record only while it is down. Each down-signal bumps the
//! consecutive-failure count and re-arms the retry window, so repeated
//! failures while already down keep pushing the window further out.
//! An up-signal drops the record entirely.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::metrics::metrics;

/// Default base delay between retries of a down node (milliseconds)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Failure state for a node that is currently down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHealthRecord {
    /// Down-signals since the last up-signal
    pub failure_count: u32,
    /// Monotonic timestamp (ms) before which the node is skipped
    pub retry_not_before: u64,
}

/// Tracks which nodes are down and when they may be retried
///
/// Records are keyed by bare node address: endpoints that share a node but
/// differ in options share one record.
#[derive(Debug)]
pub struct NodeHealthTracker {
    /// Down nodes (node -> record)
    records: DashMap<String, NodeHealthRecord>,
    /// Base delay (ms)
    base_delay_ms: u64,
}

impl Default for NodeHealthTracker {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE_MS)
    }
}

impl NodeHealthTracker {
    pub fn new(base_delay_ms: u64) -> Self {
        Self {
            records: DashMap::new(),
            base_delay_ms,
        }
    }

    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self::new(base_delay.as_millis() as u64)
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    /// Record a down-signal for `node` observed at `now_ms`
    ///
    /// First failure: count 1, retry at `now + base * 2`.
    /// Failure `n + 1`: retry at `now + base * (n + 2)`.
    pub fn mark_down(&self, node: &str, now_ms: u64) -> NodeHealthRecord {
        // Entry API holds the shard lock, so concurrent down-signals for the
        // same node cannot lose an increment.
        let record = match self.records.entry(node.to_string()) {
            Entry::Occupied(mut occupied) => {
                let failure_count = occupied.get().failure_count.saturating_add(1);
                let record = NodeHealthRecord {
                    failure_count,
                    retry_not_before: self.retry_at(now_ms, failure_count),
                };
                occupied.insert(record);
                record
            }
            Entry::Vacant(vacant) => {
                let record = NodeHealthRecord {
                    failure_count: 1,
                    retry_not_before: self.retry_at(now_ms, 1),
                };
                vacant.insert(record);
                record
            }
        };

        let newly_down = record.failure_count == 1;
        metrics().record_node_down(newly_down);
        if newly_down {
            warn!(
                node = %node,
                retry_not_before = record.retry_not_before,
                "Node marked down"
            );
        } else {
            debug!(
                node = %node,
                failure_count = record.failure_count,
                retry_not_before = record.retry_not_before,
                "Node still down, backoff extended"
            );
        }
        record
    }

    /// Clear any failure state for `node`
    ///
    /// Returns true if the node was down.
    pub fn mark_up(&self, node: &str) -> bool {
        let was_down = self.records.remove(node).is_some();
        metrics().record_node_up(was_down);
        if was_down {
            info!(node = %node, "Node marked up");
        }
        was_down
    }

    /// Whether `node` may be tried at `now_ms`
    pub fn is_retry_due(&self, node: &str, now_ms: u64) -> bool {
        self.records
            .get(node)
            .map(|r| r.retry_not_before <= now_ms)
            .unwrap_or(true)
    }

    /// Consecutive failures for `node` (0 when healthy)
    pub fn failure_count(&self, node: &str) -> u32 {
        self.records.get(node).map(|r| r.failure_count).unwrap_or(0)
    }

    /// Current record for `node`, if it is down
    pub fn record(&self, node: &str) -> Option<NodeHealthRecord> {
        self.records.get(node).map(|r| *r)
    }

    /// Snapshot of every down node
    pub fn down_nodes(&self) -> Vec<(String, NodeHealthRecord)> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }

    /// Number of nodes currently down
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn retry_at(&self, now_ms: u64, failure_count: u32) -> u64 {
        let multiplier = u64::from(failure_count) + 1;
        now_ms.saturating_add(self.base_delay_ms.saturating_mul(multiplier))
    }
}
