// tests/common/mod.rs

//! Shared fixtures for the test suite.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use huey_exporter::core::cache::Clock;
use huey_exporter::core::errors::ExporterError;
use huey_exporter::core::store::{MemoryStore, QueueStore, StoreMessage, StoreSubscriber};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A manually advanced clock, so expiry tests never sleep.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Wraps a [`MemoryStore`], recording every channel set passed to subscribe
/// and unsubscribe. Channel sets are recorded sorted, so assertions are
/// deterministic.
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub subscriptions: Arc<Mutex<Vec<Vec<String>>>>,
    pub unsubscriptions: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            unsubscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QueueStore for RecordingStore {
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ExporterError> {
        self.inner.keys(pattern).await
    }

    async fn list_len(&self, key: &str) -> Result<u64, ExporterError> {
        self.inner.list_len(key).await
    }

    async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Bytes>, ExporterError> {
        self.inner.list_range(key, start, stop).await
    }

    async fn subscriber(&self) -> Result<Box<dyn StoreSubscriber>, ExporterError> {
        Ok(Box::new(RecordingSubscriber {
            inner: self.inner.subscriber().await?,
            subscriptions: self.subscriptions.clone(),
            unsubscriptions: self.unsubscriptions.clone(),
        }))
    }
}

pub struct RecordingSubscriber {
    inner: Box<dyn StoreSubscriber>,
    subscriptions: Arc<Mutex<Vec<Vec<String>>>>,
    unsubscriptions: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl StoreSubscriber for RecordingSubscriber {
    async fn subscribe(&mut self, channels: &[String]) -> Result<(), ExporterError> {
        let mut sorted = channels.to_vec();
        sorted.sort();
        self.subscriptions.lock().push(sorted);
        self.inner.subscribe(channels).await
    }

    async fn unsubscribe(&mut self, channels: &[String]) -> Result<(), ExporterError> {
        let mut sorted = channels.to_vec();
        sorted.sort();
        self.unsubscriptions.lock().push(sorted);
        self.inner.unsubscribe(channels).await
    }

    async fn next_message(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<StoreMessage>, ExporterError> {
        self.inner.next_message(timeout).await
    }
}
