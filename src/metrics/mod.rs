//! Prometheus metrics for the cluster registry
//!
//! Metrics live in a process-wide registry; callers render them with
//! [`Metrics::gather`] and expose them however their application does.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::OnceLock;

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Registry metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Membership metrics
    /// Endpoints inserted into the registry
    pub endpoints_added_total: IntCounter,
    /// Endpoints the client factory failed to materialize
    pub endpoint_materialization_failures_total: IntCounter,

    // Selection metrics
    /// Selections by outcome
    pub selections_total: IntCounterVec,

    // Health metrics
    /// Up/down signals applied
    pub health_signals_total: IntCounterVec,
    /// Nodes currently in backoff
    pub nodes_down: IntGauge,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let endpoints_added_total = IntCounter::new(
            "cluster_registry_endpoints_added_total",
            "Total number of endpoints added to the registry",
        )
        .expect("valid metric");

        let endpoint_materialization_failures_total = IntCounter::new(
            "cluster_registry_endpoint_materialization_failures_total",
            "Total number of endpoints the client factory failed to materialize",
        )
        .expect("valid metric");

        let selections_total = IntCounterVec::new(
            Opts::new(
                "cluster_registry_selections_total",
                "Total number of client selections by outcome",
            ),
            &["outcome"], // ok, no_node_available, cluster_not_configured, factory
        )
        .expect("valid metric");

        let health_signals_total = IntCounterVec::new(
            Opts::new(
                "cluster_registry_health_signals_total",
                "Total number of node health signals applied",
            ),
            &["signal"], // up, down
        )
        .expect("valid metric");

        let nodes_down = IntGauge::new(
            "cluster_registry_nodes_down",
            "Current number of nodes in backoff",
        )
        .expect("valid metric");

        // Register all metrics
        for collector in [
            Box::new(endpoints_added_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(endpoint_materialization_failures_total.clone()),
            Box::new(selections_total.clone()),
            Box::new(health_signals_total.clone()),
            Box::new(nodes_down.clone()),
        ] {
            registry.register(collector).expect("unique metric");
        }

        Self {
            registry,
            endpoints_added_total,
            endpoint_materialization_failures_total,
            selections_total,
            health_signals_total,
            nodes_down,
        }
    }

    pub fn record_endpoint_added(&self) {
        self.endpoints_added_total.inc();
    }

    pub fn record_materialization_failure(&self) {
        self.endpoint_materialization_failures_total.inc();
    }

    /// Record a selection outcome
    pub fn record_selection(&self, outcome: &str) {
        self.selections_total.with_label_values(&[outcome]).inc();
    }

    /// Record a down-signal; `newly_down` when the node had no record yet
    ///
    /// The gauge moves by deltas, so several trackers in one process add up
    /// instead of overwriting each other.
    pub fn record_node_down(&self, newly_down: bool) {
        self.health_signals_total.with_label_values(&["down"]).inc();
        if newly_down {
            self.nodes_down.inc();
        }
    }

    /// Record an up-signal; `was_down` when a record was cleared
    pub fn record_node_up(&self, was_down: bool) {
        self.health_signals_total.with_label_values(&["up"]).inc();
        if was_down {
            self.nodes_down.dec();
        }
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_metrics() {
        let m = Metrics::new();
        m.record_endpoint_added();
        m.record_selection("ok");
        m.record_node_down(true);

        let text = m.gather();
        assert!(text.contains("cluster_registry_endpoints_added_total 1"));
        assert!(text.contains("cluster_registry_selections_total{outcome=\"ok\"} 1"));
        assert!(text.contains("cluster_registry_nodes_down 1"));
    }

    #[test]
    fn test_nodes_down_tracks_deltas() {
        let m = Metrics::new();
        // Two trackers each take a node down; one of them repeats
        m.record_node_down(true);
        m.record_node_down(true);
        m.record_node_down(false);
        assert_eq!(m.nodes_down.get(), 2);

        m.record_node_up(true);
        m.record_node_up(false);
        assert_eq!(m.nodes_down.get(), 1);
        assert_eq!(m.health_signals_total.with_label_values(&["down"]).get(), 3);
        assert_eq!(m.health_signals_total.with_label_values(&["up"]).get(), 2);
    }
}
