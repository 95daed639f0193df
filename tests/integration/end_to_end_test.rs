// tests/integration/end_to_end_test.rs

//! End-to-end flow: a queue key in the store becomes gauges, and published
//! events become counters, all visible in the text exposition.

use super::test_helpers::{TestExporter, test_config, wait_until};
use huey_exporter::core::store::MemoryStore;
use std::time::Duration;

#[tokio::test]
async fn test_key_to_exposition_flow() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.abc123", [br#"{"task":"queue_task_my_job"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);

    // Discovery finds "abc123"; the listener subscribes to that channel.
    assert!(exporter.wait_for_subscriptions(1).await);
    assert_eq!(exporter.subscriptions.lock()[0], vec!["abc123".to_string()]);

    // The sampler reports the backlog.
    let metrics = exporter.ctx.metrics.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.queue_length.with_label_values(&["abc123"]).get() == 1
        })
        .await
    );
    assert_eq!(metrics.queue_task_count.with_label_values(&["abc123", "my_job"]).get(), 1);

    // A finished event lands in the counter and the histogram.
    exporter.store.publish(
        "abc123",
        br#"{"status":"finished","task":"queue_task_my_job","duration":1.5}"#.as_slice(),
    );
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.finished_tasks.with_label_values(&["abc123", "my_job"]).get() == 1
        })
        .await
    );
    let histogram = metrics.task_duration_seconds.with_label_values(&["abc123", "my_job"]);
    assert_eq!(histogram.get_sample_count(), 1);
    assert_eq!(histogram.get_sample_sum(), 1.5);

    // Everything shows up in the text exposition.
    let exposition = metrics.encode().unwrap();
    assert!(exposition.contains("huey_queue_length"));
    assert!(exposition.contains("huey_finished_tasks"));
    assert!(exposition.contains(r#"queue_name="abc123""#));
    assert!(exposition.contains(r#"task_name="my_job""#));

    exporter.shutdown().await;
}

#[tokio::test]
async fn test_every_status_reaches_its_counter() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.mailers", [br#"{"task":"queue_task_send_mail"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);
    assert!(exporter.wait_for_subscriptions(1).await);

    for payload in [
        br#"{"status":"enqueued","task":"queue_task_send_mail"}"#.as_slice(),
        br#"{"status":"started","task":"queue_task_send_mail"}"#.as_slice(),
        br#"{"status":"finished","task":"queue_task_send_mail","duration":0.25}"#.as_slice(),
        br#"{"status":"error-task","task":"queue_task_send_mail"}"#.as_slice(),
    ] {
        exporter.store.publish("mailers", payload);
    }

    let metrics = exporter.ctx.metrics.clone();
    let labels = ["mailers", "send_mail"];
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.enqueued_tasks.with_label_values(&labels).get() == 1
                && metrics.started_tasks.with_label_values(&labels).get() == 1
                && metrics.finished_tasks.with_label_values(&labels).get() == 1
                && metrics.error_tasks.with_label_values(&labels).get() == 1
        })
        .await
    );

    exporter.shutdown().await;
}

#[tokio::test]
async fn test_unparsable_events_are_dropped_quietly() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.mailers", [br#"{"task":"queue_task_send_mail"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);
    assert!(exporter.wait_for_subscriptions(1).await);

    exporter.store.publish("mailers", b"not json".as_slice());
    exporter.store.publish("mailers", br#"{"status":"revoked","task":"x"}"#.as_slice());
    exporter.store.publish(
        "mailers",
        br#"{"status":"enqueued","task":"queue_task_send_mail"}"#.as_slice(),
    );

    // The valid event lands; the broken ones change nothing.
    let metrics = exporter.ctx.metrics.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.enqueued_tasks.with_label_values(&["mailers", "send_mail"]).get() == 1
        })
        .await
    );
    assert_eq!(metrics.error_tasks.with_label_values(&["mailers", "send_mail"]).get(), 0);

    exporter.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_while_waiting_for_queues() {
    // No keys exist, so the listener never leaves its discovery poll.
    let exporter = TestExporter::start(test_config(), MemoryStore::new());

    tokio::time::sleep(Duration::from_millis(50)).await;
    exporter.shutdown().await;
}

#[tokio::test]
async fn test_exposition_has_series_before_any_event() {
    let store = MemoryStore::new();
    store.set_list("huey.redis.mailers", [br#"{"task":"queue_task_send_mail"}"#.as_slice()]);

    let exporter = TestExporter::start(test_config(), store);
    let metrics = exporter.ctx.metrics.clone();

    // Gauges appear from sampling alone, with no events published.
    assert!(
        wait_until(Duration::from_secs(2), || {
            metrics.queue_length.with_label_values(&["mailers"]).get() == 1
        })
        .await
    );

    exporter.shutdown().await;
}
