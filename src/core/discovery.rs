// src/core/discovery.rs

//! Discovers queue names from the store's key space.
//!
//! The store drops a queue's key as soon as its backlog empties, so raw key
//! listings flap for idle queues. [`QueueDiscovery::cached_queues`] therefore
//! feeds every listing through an [`ExpiringSet`]: a queue keeps being
//! reported (at length zero) until it has been absent for the whole cache
//! window.

use crate::core::cache::{Clock, ExpiringSet};
use crate::core::errors::ExporterError;
use crate::core::names::{self, QueueName};
use crate::core::store::QueueStore;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct QueueDiscovery {
    store: Arc<dyn QueueStore>,
    // Shared between the listener and the sampler. The lock is only held for
    // the in-memory fold, never across an await.
    cache: Mutex<ExpiringSet<QueueName>>,
}

impl QueueDiscovery {
    pub fn new(store: Arc<dyn QueueStore>, cache_window: Duration) -> Self {
        Self {
            store,
            cache: Mutex::new(ExpiringSet::new(cache_window)),
        }
    }

    pub fn with_clock(
        store: Arc<dyn QueueStore>,
        cache_window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache: Mutex::new(ExpiringSet::with_clock(cache_window, clock)),
        }
    }

    /// Queue names currently present under the key namespace, with the
    /// namespace prefix stripped. Uncached and uncleaned.
    pub async fn raw_names(&self) -> Result<Vec<String>, ExporterError> {
        let pattern = format!("{}*", names::QUEUE_KEY_PREFIX);
        let keys = self.store.keys(&pattern).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(names::QUEUE_KEY_PREFIX))
            .map(str::to_string)
            .collect())
    }

    /// Raw names mapped through the channel-safe cleaning rule. Distinct raw
    /// names may collapse onto one cleaned name.
    pub async fn cleaned_names(&self) -> Result<Vec<String>, ExporterError> {
        Ok(self
            .raw_names()
            .await?
            .iter()
            .map(|raw| names::clean_queue_name(raw))
            .collect())
    }

    /// The queue set every consumer works from: the current listing folded
    /// into the expiring cache, then the cache's surviving members.
    pub async fn cached_queues(&self) -> Result<HashSet<QueueName>, ExporterError> {
        let raw_names = self.raw_names().await?;
        let mut cache = self.cache.lock();
        for raw in raw_names {
            cache.insert(QueueName::from_raw(raw));
        }
        Ok(cache.snapshot())
    }
}
