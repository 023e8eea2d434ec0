//! Endpoint identity and cluster entry types

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Identifier for a logical cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ClusterKey(pub String);

impl ClusterKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Key used by callers that do not name a cluster
    pub fn default_cluster() -> Self {
        Self("default".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClusterKey {
    fn default() -> Self {
        Self::default_cluster()
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ClusterKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A single driver-level connection setting
///
/// Values are opaque to the registry; they only take part in endpoint
/// identity and are handed to the client factory unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    List(Vec<OptionValue>),
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

/// Connection settings attached to an endpoint (credentials, timeouts, keyspace, ...)
///
/// Backed by an ordered map so two option sets with the same pairs compare
/// and hash equal regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ConnectionOptions(BTreeMap<String, OptionValue>);

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Apply `shared` on top of these options; shared keys win on collision
    pub fn merged(&self, shared: &ConnectionOptions) -> ConnectionOptions {
        let mut merged = self.0.clone();
        for (k, v) in &shared.0 {
            merged.insert(k.clone(), v.clone());
        }
        ConnectionOptions(merged)
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for ConnectionOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Endpoint identity: a node address plus its connection options
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    /// Node address (host:port)
    pub node: String,
    pub options: ConnectionOptions,
}

impl ClientKey {
    pub fn new(node: impl Into<String>, options: ConnectionOptions) -> Self {
        Self {
            node: node.into(),
            options,
        }
    }

    /// Endpoint with no per-endpoint options
    pub fn bare(node: impl Into<String>) -> Self {
        Self::new(node, ConnectionOptions::default())
    }

    /// Copy of this key with `shared` options merged on top
    pub fn with_shared(&self, shared: &ConnectionOptions) -> Self {
        if shared.is_empty() {
            return self.clone();
        }
        Self {
            node: self.node.clone(),
            options: self.options.merged(shared),
        }
    }
}

impl From<&str> for ClientKey {
    fn from(node: &str) -> Self {
        Self::bare(node)
    }
}

impl From<String> for ClientKey {
    fn from(node: String) -> Self {
        Self::bare(node)
    }
}

/// Status of a registered entry
///
/// Entries are always `Up`; node health lives in the health tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryStatus {
    #[default]
    Up,
}

/// One configured endpoint within a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    pub cluster_key: ClusterKey,
    pub client_key: ClientKey,
    pub status: EntryStatus,
}

impl ClusterEntry {
    pub fn new(cluster_key: ClusterKey, client_key: ClientKey) -> Self {
        Self {
            cluster_key,
            client_key,
            status: EntryStatus::Up,
        }
    }

    pub fn node(&self) -> &str {
        &self.client_key.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cluster_key() {
        assert_eq!(ClusterKey::default(), ClusterKey::from("default"));
        assert_eq!(ClusterKey::default_cluster().to_string(), "default");
    }

    #[test]
    fn test_options_equality_ignores_insertion_order() {
        let a = ConnectionOptions::new().with("user", "app").with("timeout", 500);
        let b = ConnectionOptions::new().with("timeout", 500).with("user", "app");
        assert_eq!(a, b);
        assert_eq!(ClientKey::new("n1:9042", a), ClientKey::new("n1:9042", b));
    }

    #[test]
    fn test_client_key_identity_includes_options() {
        let plain = ClientKey::bare("n1:9042");
        let with_ks = ClientKey::new("n1:9042", ConnectionOptions::new().with("keyspace", "app"));
        assert_ne!(plain, with_ks);
    }

    #[test]
    fn test_shared_options_override() {
        let own = ConnectionOptions::new()
            .with("keyspace", "local")
            .with("timeout", 100);
        let shared = ConnectionOptions::new().with("keyspace", "shared");

        let merged = own.merged(&shared);
        assert_eq!(merged.get("keyspace"), Some(&OptionValue::from("shared")));
        assert_eq!(merged.get("timeout"), Some(&OptionValue::Integer(100)));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_with_shared_empty_is_identity() {
        let key = ClientKey::new("n1:9042", ConnectionOptions::new().with("user", "app"));
        assert_eq!(key.with_shared(&ConnectionOptions::new()), key);
    }
}
