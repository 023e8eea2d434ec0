//! Cluster service: the single owner of registry and health mutations
//!
//! All writes (endpoint registration, up/down signals) are sent to one
//! task and applied in arrival order. Reads go straight to the shared
//! registry and tracker through [`ClusterHandle`] without passing through
//! the task.

mod command;
mod handle;

pub use handle::{ClusterHandle, HealthNotifier};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::RegistrySettings;
use crate::factory::ClientFactory;
use crate::health::{Clock, MonotonicClock, NodeHealthTracker};
use crate::registry::ClusterRegistry;
use crate::router::Selector;

use command::Command;

/// Task state owning every mutation
pub struct ClusterService<F: ClientFactory> {
    registry: Arc<ClusterRegistry>,
    health: Arc<NodeHealthTracker>,
    factory: Arc<F>,
    clock: Arc<dyn Clock>,
    rx: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
}

impl<F: ClientFactory> ClusterService<F> {
    /// Spawn the service on the current runtime using the monotonic clock
    pub fn spawn(
        factory: F,
        settings: &RegistrySettings,
        shutdown: CancellationToken,
    ) -> (ClusterHandle<F>, JoinHandle<()>) {
        Self::spawn_with_clock(factory, settings, Arc::new(MonotonicClock), shutdown)
    }

    /// Spawn the service with an explicit clock
    pub fn spawn_with_clock(
        factory: F,
        settings: &RegistrySettings,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> (ClusterHandle<F>, JoinHandle<()>) {
        let registry = Arc::new(ClusterRegistry::new());
        let health = Arc::new(NodeHealthTracker::new(settings.backoff_base_ms));
        let factory = Arc::new(factory);
        let (tx, rx) = mpsc::unbounded_channel();

        let selector = Arc::new(Selector::new(
            registry.clone(),
            health.clone(),
            factory.clone(),
            clock.clone(),
        ));

        let service = Self {
            registry: registry.clone(),
            health: health.clone(),
            factory,
            clock,
            rx,
            shutdown,
        };

        info!(
            backoff_base_ms = settings.backoff_base_ms,
            call_timeout_ms = settings.call_timeout_ms,
            "Cluster service starting"
        );
        let task = tokio::spawn(service.run());

        let handle = ClusterHandle::new(tx, registry, health, selector, settings.call_timeout());
        (handle, task)
    }

    /// Process commands until shutdown or until every handle is dropped
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Cluster service shutting down");
                    break;
                }
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => {
                        debug!("All cluster handles dropped");
                        break;
                    }
                },
            }
        }
    }

    async fn handle(&self, cmd: Command) {
        debug!(command = cmd.name(), "Applying command");
        match cmd {
            Command::AddNodes {
                cluster_key,
                endpoints,
                shared_options,
                reply,
            } => {
                // The factory is synchronous and may block; run it off the
                // runtime threads and wait here so writes stay in order
                let registry = self.registry.clone();
                let factory = self.factory.clone();
                let write = tokio::task::spawn_blocking(move || {
                    registry.add_nodes(&cluster_key, &endpoints, &shared_options, factory.as_ref())
                });
                match write.await {
                    Ok(report) => {
                        let _ = reply.send(report);
                    }
                    // Dropping the reply surfaces as ServiceStopped to the caller
                    Err(e) => error!(error = %e, "Endpoint registration task failed"),
                }
            }
            Command::MarkDown { node, reply } => {
                let record = self.health.mark_down(&node, self.clock.now_ms());
                if let Some(reply) = reply {
                    let _ = reply.send(record);
                }
            }
            Command::MarkUp { node, reply } => {
                let was_down = self.health.mark_up(&node);
                if let Some(reply) = reply {
                    let _ = reply.send(was_down);
                }
            }
        }
    }
}
