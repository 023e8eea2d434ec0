//! Integration tests for the cluster registry
//!
//! Run with: cargo test --test integration
//!
//! Everything runs in-process against a stub client factory and a manual
//! clock, so no database is needed.

mod concurrency;
mod scenario;
mod selection;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cluster_registry::config::RegistrySettings;
use cluster_registry::{
    ClientFactory, ClientKey, ClusterHandle, ClusterService, ConnectionOptions, FactoryError,
    ManualClock,
};
use tokio_util::sync::CancellationToken;

/// Factory that hands back the node address and counts calls
#[derive(Default)]
pub struct RecordingFactory {
    calls: Arc<AtomicUsize>,
}

impl RecordingFactory {
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl ClientFactory for RecordingFactory {
    type Client = String;

    fn get_client(&self, node: &str, _: &ConnectionOptions) -> Result<String, FactoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(node.to_string())
    }
}

/// Running service plus the knobs tests need
pub struct TestCluster {
    pub handle: ClusterHandle<RecordingFactory>,
    pub clock: Arc<ManualClock>,
    pub factory_calls: Arc<AtomicUsize>,
    pub shutdown: CancellationToken,
}

impl TestCluster {
    /// Start a service at `t0` with a 500 ms backoff base
    pub fn start(t0: u64) -> Self {
        let clock = Arc::new(ManualClock::new(t0));
        let factory = RecordingFactory::default();
        let factory_calls = factory.calls();
        let shutdown = CancellationToken::new();
        let (handle, _task) = ClusterService::spawn_with_clock(
            factory,
            &RegistrySettings::default(),
            clock.clone(),
            shutdown.clone(),
        );
        Self {
            handle,
            clock,
            factory_calls,
            shutdown,
        }
    }

    pub fn calls(&self) -> usize {
        self.factory_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.factory_calls.store(0, Ordering::SeqCst);
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub fn endpoints(nodes: &[&str]) -> Vec<ClientKey> {
    nodes.iter().map(|n| ClientKey::bare(*n)).collect()
}
