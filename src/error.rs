//! Registry error types

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::factory::FactoryError;
use crate::registry::ClusterKey;

/// Result type for registry operations
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors surfaced by the registry, selector and service
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Cluster not configured: {0}")]
    ClusterNotConfigured(ClusterKey),

    #[error("No node available in cluster {0}")]
    NoNodeAvailable(ClusterKey),

    #[error("Failed to materialize endpoint {node}: {source}")]
    Materialization {
        node: String,
        #[source]
        source: FactoryError,
    },

    #[error("Client factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Administrative call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cluster service stopped")]
    ServiceStopped,
}

impl ClusterError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClusterNotConfigured(_) => "cluster_not_configured",
            Self::NoNodeAvailable(_) => "no_node_available",
            Self::Materialization { .. } => "materialization",
            Self::Factory(_) => "factory",
            Self::Config(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::ServiceStopped => "service_stopped",
        }
    }
}
