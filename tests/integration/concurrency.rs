//! Readers running alongside the single writer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cluster_registry::{ClusterError, ClusterKey};

use crate::{endpoints, TestCluster};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_selection_while_nodes_are_added() {
    let cluster = TestCluster::start(0);
    let key = ClusterKey::from("c");
    cluster
        .handle
        .add_nodes_to(key.clone(), endpoints(&["seed"]))
        .await
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..4 {
        let handle = cluster.handle.clone();
        let key = key.clone();
        let done = done.clone();
        readers.push(tokio::spawn(async move {
            let mut selections = 0usize;
            while !done.load(Ordering::SeqCst) {
                let entries = handle.entries(&key).unwrap();
                assert!(!entries.is_empty());
                handle.select_client_from(&key).unwrap();
                selections += 1;
                tokio::task::yield_now().await;
            }
            selections
        }));
    }

    for i in 0..50 {
        let node = format!("n{}", i);
        cluster
            .handle
            .add_nodes_to(key.clone(), endpoints(&[node.as_str()]))
            .await
            .unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cluster.handle.entries(&key).unwrap().len(), 51);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signals_are_all_applied() {
    let cluster = TestCluster::start(0);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let notifier = cluster.handle.notifier();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                notifier.notify_down("n1");
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Round trip flushes everything queued before it
    let record = cluster.handle.mark_node_down("n1").await.unwrap();
    assert_eq!(record.failure_count, 201);
}

#[tokio::test]
async fn test_signals_and_admin_calls_share_one_queue() {
    let cluster = TestCluster::start(0);
    cluster.handle.add_nodes(endpoints(&["a"])).await.unwrap();

    // Both go through the same queue, so the up-signal lands first
    cluster.handle.notifier().notify_up("a");
    cluster.handle.mark_node_down("a").await.unwrap();
    assert!(matches!(
        cluster.handle.select_client(),
        Err(ClusterError::NoNodeAvailable(_))
    ));
}
