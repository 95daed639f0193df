// tests/integration/listener_test.rs

//! Listener behavior around queue-set changes: resubscription happens once
//! per change, never with an empty set, and new channels start counting.

use super::test_helpers::{TestExporter, test_config, wait_until};
use huey_exporter::core::store::MemoryStore;
use std::time::Duration;

#[tokio::test]
async fn test_new_queue_triggers_one_resubscription() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.q1", [br#"{"task":"queue_task_a"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);
    assert!(exporter.wait_for_subscriptions(1).await);
    assert_eq!(exporter.subscriptions.lock()[0], vec!["q1".to_string()]);

    // A second queue appears; the next drain-cycle boundary resubscribes.
    exporter.store.set_list("huey.redis.q2", [br#"{"task":"queue_task_b"}"#.as_slice()]);
    assert!(exporter.wait_for_subscriptions(2).await);

    {
        let subscriptions = exporter.subscriptions.lock();
        assert_eq!(subscriptions[1], vec!["q1".to_string(), "q2".to_string()]);
        // The old set was dropped exactly once on the way.
        assert_eq!(*exporter.unsubscriptions.lock(), vec![vec!["q1".to_string()]]);
        // No call ever carried an empty channel set.
        assert!(subscriptions.iter().all(|channels| !channels.is_empty()));
    }

    // Events on the new channel are counted after the resubscription.
    exporter.store.publish("q2", br#"{"status":"enqueued","task":"queue_task_b"}"#.as_slice());
    let metrics = exporter.ctx.metrics.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.enqueued_tasks.with_label_values(&["q2", "b"]).get() == 1
        })
        .await
    );

    exporter.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_queue_set_does_not_resubscribe() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.q1", [br#"{"task":"queue_task_a"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);
    assert!(exporter.wait_for_subscriptions(1).await);

    // Several drain cycles pass with the same queue set.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(exporter.subscriptions.lock().len(), 1);
    assert!(exporter.unsubscriptions.lock().is_empty());

    exporter.shutdown().await;
}

#[tokio::test]
async fn test_events_before_any_queue_exists_are_not_counted() {
    let exporter = TestExporter::start(test_config(), MemoryStore::new());

    // No queue has ever been discovered, so nothing is subscribed and the
    // publish goes nowhere.
    exporter.store.publish("ghost", br#"{"status":"enqueued","task":"queue_task_a"}"#.as_slice());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let metrics = exporter.ctx.metrics.clone();
    assert_eq!(metrics.enqueued_tasks.with_label_values(&["ghost", "a"]).get(), 0);

    exporter.shutdown().await;
}
