use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use cluster_registry::config::{self, Config};
use cluster_registry::metrics::metrics;
use cluster_registry::{AddrClientFactory, ClusterService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_or_default_config()?;

    let shutdown = CancellationToken::new();
    let (handle, task) =
        ClusterService::spawn(AddrClientFactory, &config.registry, shutdown.clone());

    let reports = handle.ingest(&config).await?;
    let failed: usize = reports.iter().map(|r| r.failed.len()).sum();

    let stats = handle.registry().stats();
    info!(
        clusters = stats.clusters,
        endpoints = stats.endpoints,
        nodes = stats.nodes,
        failed = failed,
        "Cluster registry ready"
    );

    for cluster_key in handle.registry().cluster_keys() {
        match handle.select_client_from(&cluster_key) {
            Ok(client) => info!(cluster = %cluster_key, node = %client.addr(), "Sample selection"),
            Err(e) => warn!(cluster = %cluster_key, error = %e, "Sample selection failed"),
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown.cancel();
    if let Err(e) = task.await {
        error!(error = %e, "Cluster service task failed");
    }

    print!("{}", metrics().gather());
    Ok(())
}

fn load_or_default_config() -> anyhow::Result<Config> {
    // An explicitly named file must load; the fallbacks are best effort
    if let Ok(path) = std::env::var("CLUSTER_REGISTRY_CONFIG") {
        let config = config::load_config(&path)?;
        info!(path = %path, "Loaded configuration");
        return Ok(config);
    }

    let config_paths = ["config/registry.toml", "registry.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return Ok(config);
            }
            Err(config::ConfigError::IoError(e)) => {
                warn!(path = path, error = %e, "Failed to read config");
            }
            // Malformed definitions are fatal at startup
            Err(e) => return Err(e.into()),
        }
    }

    info!("Using default configuration");
    Ok(Config::default())
}
