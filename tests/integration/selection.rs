//! Selection properties against a running service

use cluster_registry::{ClusterError, ClusterKey};

use crate::{endpoints, TestCluster};

#[tokio::test]
async fn test_down_node_excluded_from_100_selections() {
    let cluster = TestCluster::start(0);
    let key = ClusterKey::from("c");
    cluster
        .handle
        .add_nodes_to(key.clone(), endpoints(&["a", "b"]))
        .await
        .unwrap();
    cluster.handle.mark_node_down("a").await.unwrap();

    for _ in 0..100 {
        assert_eq!(cluster.handle.select_client_from(&key).unwrap(), "b");
    }
}

#[tokio::test]
async fn test_exhausted_cluster_makes_no_factory_call() {
    let cluster = TestCluster::start(0);
    let key = ClusterKey::from("c");
    cluster
        .handle
        .add_nodes_to(key.clone(), endpoints(&["a", "b"]))
        .await
        .unwrap();
    cluster.handle.mark_node_down("a").await.unwrap();
    cluster.handle.mark_node_down("b").await.unwrap();
    cluster.reset_calls();

    let err = cluster.handle.select_client_from(&key).unwrap_err();
    assert!(matches!(err, ClusterError::NoNodeAvailable(k) if k == key));
    assert_eq!(cluster.calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_cluster_has_no_side_effects() {
    let cluster = TestCluster::start(0);
    cluster.handle.add_nodes(endpoints(&["a"])).await.unwrap();
    cluster.reset_calls();

    let err = cluster
        .handle
        .select_client_from(&ClusterKey::from("no-such-cluster"))
        .unwrap_err();
    assert!(matches!(err, ClusterError::ClusterNotConfigured(_)));
    assert_eq!(cluster.calls(), 0);
    assert!(cluster.handle.health().is_empty());
    assert_eq!(cluster.handle.registry().cluster_keys().len(), 1);
}

#[tokio::test]
async fn test_dedup_across_calls() {
    let cluster = TestCluster::start(0);
    let key = ClusterKey::from("c");
    cluster
        .handle
        .add_nodes_to(key.clone(), endpoints(&["a"]))
        .await
        .unwrap();
    cluster
        .handle
        .add_nodes_to(key.clone(), endpoints(&["a"]))
        .await
        .unwrap();

    assert_eq!(cluster.handle.entries(&key).unwrap().len(), 1);
}

#[tokio::test]
async fn test_health_is_shared_by_node_across_options() {
    use cluster_registry::{ClientKey, ConnectionOptions};

    let cluster = TestCluster::start(0);
    let key = ClusterKey::from("c");
    let keys = vec![
        ClientKey::bare("a"),
        ClientKey::new("a", ConnectionOptions::new().with("keyspace", "other")),
    ];
    cluster.handle.add_nodes_to(key.clone(), keys).await.unwrap();
    assert_eq!(cluster.handle.entries(&key).unwrap().len(), 2);

    cluster.handle.mark_node_down("a").await.unwrap();
    assert!(matches!(
        cluster.handle.select_client_from(&key),
        Err(ClusterError::NoNodeAvailable(_))
    ));
}
