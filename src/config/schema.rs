use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use crate::health::DEFAULT_BACKOFF_BASE_MS;
use crate::registry::{ClientKey, ClusterKey, ConnectionOptions};

use super::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Registry tunables
    #[serde(default)]
    pub registry: RegistrySettings,
    /// Flat endpoint list for the default cluster
    #[serde(default)]
    pub nodes: Option<Vec<EndpointDef>>,
    /// Named cluster definitions
    #[serde(default)]
    pub clusters: Option<ClustersDef>,
}

// ============================================================================
// Registry Settings
// ============================================================================

/// Tunables for the registry service
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// Base backoff delay for down nodes (milliseconds)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Timeout for administrative calls into the service (milliseconds)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl RegistrySettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

// ============================================================================
// Cluster Definitions
// ============================================================================

/// One endpoint as written in configuration
///
/// Accepts `"host:port"`, `{ node = "host:port", options = { ... } }` or
/// `["host:port", { ... }]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EndpointDef {
    Node(String),
    Table {
        node: String,
        #[serde(default)]
        options: ConnectionOptions,
    },
    Pair(String, ConnectionOptions),
}

impl EndpointDef {
    fn to_client_key(&self) -> Result<ClientKey, ConfigError> {
        let (node, options) = match self {
            Self::Node(node) => (node, ConnectionOptions::default()),
            Self::Table { node, options } | Self::Pair(node, options) => (node, options.clone()),
        };
        let node = node.trim();
        if node.is_empty() {
            return Err(ConfigError::Invalid("empty node address".to_string()));
        }
        Ok(ClientKey::new(node, options))
    }
}

/// Endpoints of one cluster, with or without shared options
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClusterDef {
    Nodes(Vec<EndpointDef>),
    WithOptions {
        nodes: Vec<EndpointDef>,
        #[serde(default)]
        options: ConnectionOptions,
    },
}

/// Cluster definition in list form
#[derive(Debug, Clone, Deserialize)]
pub struct NamedClusterDef {
    pub name: String,
    pub nodes: Vec<EndpointDef>,
    #[serde(default)]
    pub options: ConnectionOptions,
}

/// `[clusters.<name>]` tables or a `[[clusters]]` array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClustersDef {
    Map(BTreeMap<String, ClusterDef>),
    List(Vec<NamedClusterDef>),
}

/// Canonical form of one cluster definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub cluster_key: ClusterKey,
    pub endpoints: Vec<ClientKey>,
    pub shared_options: ConnectionOptions,
}

impl Config {
    /// Normalize every accepted configuration shape into cluster specs
    ///
    /// The flat `nodes` list maps to the default cluster. A cluster named
    /// twice is rejected, as is an empty cluster name or node address.
    pub fn cluster_specs(&self) -> Result<Vec<ClusterSpec>, ConfigError> {
        let mut specs = Vec::new();

        if let Some(nodes) = &self.nodes {
            specs.push(Self::spec(
                ClusterKey::default_cluster(),
                nodes,
                ConnectionOptions::default(),
            )?);
        }

        match &self.clusters {
            None => {}
            Some(ClustersDef::Map(map)) => {
                for (name, def) in map {
                    let (nodes, options) = match def {
                        ClusterDef::Nodes(nodes) => (nodes, ConnectionOptions::default()),
                        ClusterDef::WithOptions { nodes, options } => (nodes, options.clone()),
                    };
                    specs.push(Self::spec(Self::cluster_key(name)?, nodes, options)?);
                }
            }
            Some(ClustersDef::List(list)) => {
                for def in list {
                    specs.push(Self::spec(
                        Self::cluster_key(&def.name)?,
                        &def.nodes,
                        def.options.clone(),
                    )?);
                }
            }
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(&spec.cluster_key) {
                return Err(ConfigError::Invalid(format!(
                    "cluster '{}' defined more than once",
                    spec.cluster_key
                )));
            }
        }

        Ok(specs)
    }

    fn cluster_key(name: &str) -> Result<ClusterKey, ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("empty cluster name".to_string()));
        }
        Ok(ClusterKey::new(name))
    }

    fn spec(
        cluster_key: ClusterKey,
        nodes: &[EndpointDef],
        shared_options: ConnectionOptions,
    ) -> Result<ClusterSpec, ConfigError> {
        let endpoints = nodes
            .iter()
            .map(EndpointDef::to_client_key)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClusterSpec {
            cluster_key,
            endpoints,
            shared_options,
        })
    }
}
