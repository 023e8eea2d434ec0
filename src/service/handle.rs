//! Client-facing handle to the cluster service

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ClusterError, ClusterResult};
use crate::factory::ClientFactory;
use crate::health::{NodeHealthRecord, NodeHealthTracker};
use crate::registry::{
    AddReport, ClientKey, ClusterEntry, ClusterKey, ClusterRegistry, ConnectionOptions,
};
use crate::router::Selector;

use super::command::Command;

/// Administrative and request-path API of the cluster service
///
/// Cheap to clone; every clone talks to the same service task.
pub struct ClusterHandle<F: ClientFactory> {
    tx: mpsc::UnboundedSender<Command>,
    registry: Arc<ClusterRegistry>,
    health: Arc<NodeHealthTracker>,
    selector: Arc<Selector<F>>,
    call_timeout: Duration,
}

impl<F: ClientFactory> Clone for ClusterHandle<F> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            registry: self.registry.clone(),
            health: self.health.clone(),
            selector: self.selector.clone(),
            call_timeout: self.call_timeout,
        }
    }
}

impl<F: ClientFactory> ClusterHandle<F> {
    pub(super) fn new(
        tx: mpsc::UnboundedSender<Command>,
        registry: Arc<ClusterRegistry>,
        health: Arc<NodeHealthTracker>,
        selector: Arc<Selector<F>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            tx,
            registry,
            health,
            selector,
            call_timeout,
        }
    }

    // ------------------------------------------------------------------
    // Administrative calls (serialized through the service task)
    // ------------------------------------------------------------------

    /// Add endpoints to the default cluster
    pub async fn add_nodes(&self, endpoints: Vec<ClientKey>) -> ClusterResult<AddReport> {
        self.add_nodes_with_options(
            ClusterKey::default_cluster(),
            endpoints,
            ConnectionOptions::default(),
        )
        .await
    }

    /// Add endpoints to `cluster_key`
    pub async fn add_nodes_to(
        &self,
        cluster_key: ClusterKey,
        endpoints: Vec<ClientKey>,
    ) -> ClusterResult<AddReport> {
        self.add_nodes_with_options(cluster_key, endpoints, ConnectionOptions::default())
            .await
    }

    /// Add endpoints to `cluster_key`, merging `shared_options` into each
    pub async fn add_nodes_with_options(
        &self,
        cluster_key: ClusterKey,
        endpoints: Vec<ClientKey>,
        shared_options: ConnectionOptions,
    ) -> ClusterResult<AddReport> {
        self.call(|reply| Command::AddNodes {
            cluster_key,
            endpoints,
            shared_options,
            reply,
        })
        .await
    }

    /// Mark `node` down and wait for the updated record
    pub async fn mark_node_down(&self, node: impl Into<String>) -> ClusterResult<NodeHealthRecord> {
        let node = node.into();
        self.call(|reply| Command::MarkDown {
            node,
            reply: Some(reply),
        })
        .await
    }

    /// Mark `node` up; returns whether it was down
    pub async fn mark_node_up(&self, node: impl Into<String>) -> ClusterResult<bool> {
        let node = node.into();
        self.call(|reply| Command::MarkUp {
            node,
            reply: Some(reply),
        })
        .await
    }

    /// Register every cluster defined in `config`, in definition order
    ///
    /// A malformed definition fails the whole ingestion before anything is
    /// registered. Endpoints that fail to materialize are reported per
    /// cluster and do not stop the remaining clusters.
    pub async fn ingest(&self, config: &Config) -> ClusterResult<Vec<AddReport>> {
        let specs = config.cluster_specs()?;
        let mut reports = Vec::with_capacity(specs.len());
        for spec in specs {
            let cluster_key = spec.cluster_key.clone();
            let report = self
                .add_nodes_with_options(spec.cluster_key, spec.endpoints, spec.shared_options)
                .await?;
            if report.is_complete() {
                info!(cluster = %cluster_key, added = report.added.len(), "Cluster ingested");
            } else {
                warn!(
                    cluster = %cluster_key,
                    added = report.added.len(),
                    failed = report.failed.len(),
                    "Cluster ingested with failed endpoints"
                );
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// Signal sender for connection-failure detectors
    pub fn notifier(&self) -> HealthNotifier {
        HealthNotifier {
            tx: self.tx.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Request path (direct reads, never queued behind the service task)
    // ------------------------------------------------------------------

    /// Select a client from the default cluster
    pub fn select_client(&self) -> ClusterResult<F::Client> {
        self.selector.select_client(&ClusterKey::default_cluster())
    }

    /// Select a client from `cluster_key`
    pub fn select_client_from(&self, cluster_key: &ClusterKey) -> ClusterResult<F::Client> {
        self.selector.select_client(cluster_key)
    }

    /// Entries currently registered under `cluster_key`
    pub fn entries(&self, cluster_key: &ClusterKey) -> ClusterResult<Arc<[ClusterEntry]>> {
        self.registry.get_entries(cluster_key)
    }

    /// Consecutive failures recorded for `node`
    pub fn failure_count(&self, node: &str) -> u32 {
        self.health.failure_count(node)
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<NodeHealthTracker> {
        &self.health
    }

    /// Send a command built around a reply channel and wait for the answer
    ///
    /// A `Timeout` only means the answer did not arrive in time. The command
    /// stays queued and is still applied by the service task, so an endpoint
    /// may be registered after its `add_nodes` call timed out.
    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> ClusterResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| ClusterError::ServiceStopped)?;

        match tokio::time::timeout(self.call_timeout, reply_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ClusterError::ServiceStopped),
            Err(_) => Err(ClusterError::Timeout(self.call_timeout)),
        }
    }
}

/// Producer side of node up/down signals
///
/// Handed to connection-level failure detectors. Signals are queued for the
/// service task and applied in the order they were sent; sending never
/// blocks.
#[derive(Debug, Clone)]
pub struct HealthNotifier {
    tx: mpsc::UnboundedSender<Command>,
}

impl HealthNotifier {
    /// Report that `node` failed
    pub fn notify_down(&self, node: impl Into<String>) {
        self.send(Command::MarkDown {
            node: node.into(),
            reply: None,
        });
    }

    /// Report that `node` is reachable again
    pub fn notify_up(&self, node: impl Into<String>) {
        self.send(Command::MarkUp {
            node: node.into(),
            reply: None,
        });
    }

    fn send(&self, cmd: Command) {
        if let Err(e) = self.tx.send(cmd) {
            warn!(command = e.0.name(), "Cluster service stopped, dropping health signal");
        }
    }
}
