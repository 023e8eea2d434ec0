//! Client factory seam
//!
//! The registry never opens connections itself. It asks a [`ClientFactory`]
//! to turn a `(node, options)` pair into a client handle, both when an
//! endpoint is first registered and on every selection.

use thiserror::Error;

use crate::registry::ConnectionOptions;

/// Error reported by a client factory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FactoryError {
    pub message: String,
}

impl FactoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces client handles for configured endpoints
///
/// Calls are synchronous and must be safe to repeat with the same arguments.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: Send + 'static;

    fn get_client(
        &self,
        node: &str,
        options: &ConnectionOptions,
    ) -> Result<Self::Client, FactoryError>;
}

/// Validated node address handed out by [`AddrClientFactory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
    pub options: ConnectionOptions,
}

impl NodeAddr {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Factory that only checks the node is a well-formed `host:port`
///
/// No connection is made; a real driver wraps its session builder in a
/// [`ClientFactory`] instead.
#[derive(Debug, Clone, Default)]
pub struct AddrClientFactory;

impl AddrClientFactory {
    /// Parse "host:port" into components
    fn parse_addr(addr: &str) -> Result<(&str, u16), FactoryError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| FactoryError::new(format!("Invalid address format: {}", addr)))?;
        if host.is_empty() {
            return Err(FactoryError::new(format!("Missing host: {}", addr)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| FactoryError::new(format!("Invalid port: {}", port)))?;
        Ok((host, port))
    }
}

impl ClientFactory for AddrClientFactory {
    type Client = NodeAddr;

    fn get_client(&self, node: &str, options: &ConnectionOptions) -> Result<NodeAddr, FactoryError> {
        let (host, port) = Self::parse_addr(node)?;
        Ok(NodeAddr {
            host: host.to_string(),
            port,
            options: options.clone(),
        })
    }
}
