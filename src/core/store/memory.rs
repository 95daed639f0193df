// src/core/store/memory.rs

//! An in-process store used by the test suite and local development.
//!
//! Lists live in a mutex-guarded map. Pub/sub is a single broadcast ring
//! that every subscriber filters against its own channel set. Unlike the
//! real store, this implementation surfaces subscribe and unsubscribe
//! acknowledgements as control messages, which keeps the listener's
//! filtering path exercised.

use super::{MessageKind, QueueStore, StoreMessage, StoreSubscriber};
use crate::core::errors::ExporterError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 128;

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    lists: Mutex<HashMap<String, Vec<Bytes>>>,
    publish_tx: broadcast::Sender<StoreMessage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (publish_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                lists: Mutex::new(HashMap::new()),
                publish_tx,
            }),
        }
    }

    /// Replaces the list stored at `key`.
    pub fn set_list<I, B>(&self, key: &str, items: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.inner
            .lists
            .lock()
            .insert(key.to_string(), items.into_iter().map(Into::into).collect());
    }

    /// Appends one item to the list at `key`, creating the key if absent.
    pub fn push(&self, key: &str, item: impl Into<Bytes>) {
        self.inner
            .lists
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(item.into());
    }

    /// Deletes `key`, as the store does when a backlog drains to zero.
    pub fn remove_key(&self, key: &str) {
        self.inner.lists.lock().remove(key);
    }

    /// Publishes a payload on `channel` to every live subscriber.
    pub fn publish(&self, channel: &str, payload: impl Into<Bytes>) {
        let _ = self.inner.publish_tx.send(StoreMessage {
            kind: MessageKind::Payload,
            channel: channel.to_string(),
            payload: payload.into(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ExporterError> {
        // Only the trailing-star form the exporter actually uses.
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        Ok(self
            .inner
            .lists
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_len(&self, key: &str) -> Result<u64, ExporterError> {
        Ok(self
            .inner
            .lists
            .lock()
            .get(key)
            .map_or(0, |items| items.len() as u64))
    }

    async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Bytes>, ExporterError> {
        let lists = self.inner.lists.lock();
        let Some(items) = lists.get(key) else {
            return Ok(Vec::new());
        };

        let len = items.len() as i64;
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = if start < 0 { len + start } else { start }.max(0);
        let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(items[start as usize..=stop as usize].to_vec())
    }

    async fn subscriber(&self) -> Result<Box<dyn StoreSubscriber>, ExporterError> {
        Ok(Box::new(MemorySubscriber {
            rx: self.inner.publish_tx.subscribe(),
            channels: HashSet::new(),
            pending: VecDeque::new(),
        }))
    }
}

/// One test subscriber over the shared broadcast ring.
pub struct MemorySubscriber {
    rx: broadcast::Receiver<StoreMessage>,
    channels: HashSet<String>,
    /// Acknowledgements are per-connection, so they queue locally instead of
    /// going through the ring.
    pending: VecDeque<StoreMessage>,
}

#[async_trait]
impl StoreSubscriber for MemorySubscriber {
    async fn subscribe(&mut self, channels: &[String]) -> Result<(), ExporterError> {
        for channel in channels {
            self.channels.insert(channel.clone());
            self.pending.push_back(StoreMessage {
                kind: MessageKind::Control,
                channel: channel.clone(),
                payload: Bytes::from_static(b"subscribe"),
            });
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, channels: &[String]) -> Result<(), ExporterError> {
        for channel in channels {
            self.channels.remove(channel);
            self.pending.push_back(StoreMessage {
                kind: MessageKind::Control,
                channel: channel.clone(),
                payload: Bytes::from_static(b"unsubscribe"),
            });
        }
        Ok(())
    }

    async fn next_message(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<StoreMessage>, ExporterError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match tokio::time::timeout(remaining, self.rx.recv()).await {
                Ok(Ok(message)) => {
                    if message.kind == MessageKind::Payload
                        && self.channels.contains(&message.channel)
                    {
                        return Ok(Some(message));
                    }
                    // Traffic for channels this subscriber is not watching.
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(ExporterError::Subscribe(
                        "pub/sub connection closed".to_string(),
                    ));
                }
                Err(_) => return Ok(None),
            }
        }
    }
}
