// src/core/store/mod.rs

//! The store capability consumed by discovery, sampling, and listening.
//!
//! The exporter needs five operations from its backing store: key listing,
//! list length, list range, channel subscription, and bounded-time message
//! polling. They are expressed as traits so the loops never name a concrete
//! client. [`RedisStore`] talks to a real server; [`MemoryStore`] backs the
//! test suite.

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::core::errors::ExporterError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Distinguishes application payloads from subscription acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A published payload.
    Payload,
    /// A subscribe/unsubscribe acknowledgement from the store.
    Control,
}

/// One message delivered on a pub/sub connection.
#[derive(Debug, Clone)]
pub struct StoreMessage {
    pub kind: MessageKind,
    pub channel: String,
    pub payload: Bytes,
}

/// Key-space and list operations of the backing store.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// All keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ExporterError>;

    /// Length of the list at `key`. A missing key reads as 0.
    async fn list_len(&self, key: &str) -> Result<u64, ExporterError>;

    /// Items of the list at `key` between `start` and `stop`, inclusive.
    /// Negative indexes count from the tail.
    async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Bytes>, ExporterError>;

    /// Opens a dedicated pub/sub connection.
    async fn subscriber(&self) -> Result<Box<dyn StoreSubscriber>, ExporterError>;
}

/// A pub/sub connection. Each subscriber has exactly one owner; every method
/// takes `&mut self`.
#[async_trait]
pub trait StoreSubscriber: Send {
    async fn subscribe(&mut self, channels: &[String]) -> Result<(), ExporterError>;

    async fn unsubscribe(&mut self, channels: &[String]) -> Result<(), ExporterError>;

    /// Waits up to `timeout` for the next message; `None` on timeout.
    async fn next_message(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<StoreMessage>, ExporterError>;
}
