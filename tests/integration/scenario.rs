//! End-to-end scenario: configure, fail a node, wait out its backoff

use std::time::Duration;

use cluster_registry::config::parse_config;
use cluster_registry::ClusterKey;

use crate::TestCluster;

const T0: u64 = 100_000;

#[tokio::test]
async fn test_backoff_window_end_to_end() {
    let cluster = TestCluster::start(T0);
    let config = parse_config(r#"nodes = ["n1", "n2", "n3"]"#).unwrap();
    let reports = cluster.handle.ingest(&config).await.unwrap();
    assert_eq!(reports[0].added.len(), 3);

    let record = cluster.handle.mark_node_down("n1").await.unwrap();
    assert_eq!(record.retry_not_before, T0 + 1_000);

    cluster.clock.advance(Duration::from_millis(100));
    for _ in 0..50 {
        let node = cluster.handle.select_client().unwrap();
        assert_ne!(node, "n1");
    }

    cluster.clock.set(T0 + 1_100);
    let mut saw_n1 = false;
    for _ in 0..500 {
        if cluster.handle.select_client().unwrap() == "n1" {
            saw_n1 = true;
            break;
        }
    }
    assert!(saw_n1, "n1 should be eligible once its backoff elapsed");
}

#[tokio::test]
async fn test_recovery_after_mark_up() {
    let cluster = TestCluster::start(T0);
    cluster
        .handle
        .add_nodes(crate::endpoints(&["n1"]))
        .await
        .unwrap();

    cluster.handle.mark_node_down("n1").await.unwrap();
    assert!(cluster.handle.select_client().is_err());

    cluster.handle.mark_node_up("n1").await.unwrap();
    assert!(cluster.handle.health().is_retry_due("n1", 0));
    assert_eq!(cluster.handle.select_client().unwrap(), "n1");
}

#[tokio::test]
async fn test_repeated_failures_extend_backoff() {
    let cluster = TestCluster::start(T0);
    let first = cluster.handle.mark_node_down("n1").await.unwrap();

    cluster.clock.advance(Duration::from_millis(200));
    let second = cluster.handle.mark_node_down("n1").await.unwrap();

    assert!(second.retry_not_before > first.retry_not_before);
    assert!(second.failure_count > first.failure_count);
    // now + 500 * (1 + 2)
    assert_eq!(second.retry_not_before, T0 + 200 + 1_500);
}

#[tokio::test]
async fn test_named_clusters_from_config() {
    let cluster = TestCluster::start(T0);
    let config = parse_config(
        r#"
        [[clusters]]
        name = "primary"
        nodes = ["p1", "p2"]

        [[clusters]]
        name = "secondary"
        nodes = [["s1", { keyspace = "reports" }]]
        options = { user = "ro" }
        "#,
    )
    .unwrap();
    cluster.handle.ingest(&config).await.unwrap();

    let secondary = cluster
        .handle
        .entries(&ClusterKey::from("secondary"))
        .unwrap();
    assert_eq!(secondary.len(), 1);
    assert_eq!(secondary[0].client_key.options.len(), 2);

    assert!(cluster.handle.select_client().is_err());
    let node = cluster
        .handle
        .select_client_from(&ClusterKey::from("primary"))
        .unwrap();
    assert!(node == "p1" || node == "p2");
}
