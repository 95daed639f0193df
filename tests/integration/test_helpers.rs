// tests/integration/test_helpers.rs

//! Assembly helpers for the integration tests.

use crate::common::RecordingStore;
use huey_exporter::config::Config;
use huey_exporter::core::store::MemoryStore;
use huey_exporter::server::{self, ExporterContext};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A fully assembled exporter over an in-memory store, with timings tuned
/// for tests and every subscription call recorded.
pub struct TestExporter {
    pub store: MemoryStore,
    pub subscriptions: Arc<Mutex<Vec<Vec<String>>>>,
    pub unsubscriptions: Arc<Mutex<Vec<Vec<String>>>>,
    pub ctx: ExporterContext,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    // Port 0 binds an ephemeral port so parallel test runs never collide.
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.queue_cache_ttl = Duration::from_secs(60);
    config.sampler.interval = Duration::from_millis(50);
    config.listener.drain_cycle = Duration::from_millis(100);
    config.listener.receive_timeout = Duration::from_millis(10);
    config
}

impl TestExporter {
    pub fn start(config: Config, store: MemoryStore) -> Self {
        let recording = RecordingStore::new(store.clone());
        let subscriptions = recording.subscriptions.clone();
        let unsubscriptions = recording.unsubscriptions.clone();
        let ctx = server::setup(config, Arc::new(recording)).expect("exporter setup succeeds");
        Self {
            store,
            subscriptions,
            unsubscriptions,
            ctx,
        }
    }

    /// Waits until the listener has issued at least `count` subscribe calls.
    pub async fn wait_for_subscriptions(&self, count: usize) -> bool {
        wait_until(Duration::from_secs(3), || {
            self.subscriptions.lock().len() >= count
        })
        .await
    }

    /// Signals shutdown and waits for every background task to finish.
    pub async fn shutdown(mut self) {
        self.ctx
            .shutdown_tx
            .send(())
            .expect("background tasks are listening");
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ctx.background_tasks.join_next().await.is_some() {}
        })
        .await
        .expect("background tasks stop promptly");
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout`
/// elapses. Returns whether the condition held.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
