// src/core/sampler.rs

//! Background sampling of queue backlogs into gauges.
//!
//! Each tick measures every cached queue: the backlog length goes into one
//! gauge, and the backlog's per-task composition into another. A queue whose
//! store key vanished between ticks still gets sampled (the length reads as
//! zero) for as long as the discovery cache remembers it.

use crate::core::discovery::QueueDiscovery;
use crate::core::errors::ExporterError;
use crate::core::metrics::ExporterMetrics;
use crate::core::names::{self, QueueName};
use crate::core::store::QueueStore;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct QueueSampler {
    store: Arc<dyn QueueStore>,
    discovery: Arc<QueueDiscovery>,
    metrics: Arc<ExporterMetrics>,
    interval: Duration,
    /// Task series reported per queue on the previous cycle, so series that
    /// drained since then are written back to zero instead of going stale.
    reported_tasks: HashMap<String, HashSet<String>>,
}

impl QueueSampler {
    pub fn new(
        store: Arc<dyn QueueStore>,
        discovery: Arc<QueueDiscovery>,
        metrics: Arc<ExporterMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            discovery,
            metrics,
            interval,
            reported_tasks: HashMap::new(),
        }
    }

    /// Runs sampling cycles on a fixed interval until shutdown.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Queue sampler started (interval: {:?}).", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample_all().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Queue sampler shutting down.");
                    return;
                }
            }
        }
    }

    /// One full sampling cycle over the cached queue set. A failure on one
    /// queue is logged and does not stop the others.
    pub async fn sample_all(&mut self) {
        let queues = match self.discovery.cached_queues().await {
            Ok(queues) => queues,
            Err(e) => {
                warn!("Queue discovery failed: {}. Skipping sampling cycle.", e);
                return;
            }
        };

        for queue in &queues {
            if let Err(e) = self.sample_queue(queue).await {
                warn!("Failed to sample queue '{}': {}", queue, e);
            }
        }

        self.forget_expired_queues(&queues);
    }

    async fn sample_queue(&mut self, queue: &QueueName) -> Result<(), ExporterError> {
        let key = queue.store_key();

        let length = self.store.list_len(&key).await?;
        self.metrics
            .queue_length
            .with_label_values(&[queue.cleaned()])
            .set(length as i64);
        debug!("Sampled queue '{}': {} pending item(s)", queue, length);

        let items = self.store.list_range(&key, 0, -1).await?;
        let mut task_counts: HashMap<String, i64> = HashMap::new();
        for item in &items {
            if let Some(task) = task_name_of(item) {
                *task_counts.entry(task).or_insert(0) += 1;
            }
        }

        // Series reported last cycle but drained since then go back to zero.
        let current: HashSet<String> = task_counts.keys().cloned().collect();
        if let Some(previous) = self.reported_tasks.get(queue.cleaned()) {
            for stale in previous.difference(&current) {
                self.metrics
                    .queue_task_count
                    .with_label_values(&[queue.cleaned(), stale])
                    .set(0);
            }
        }
        for (task, count) in &task_counts {
            self.metrics
                .queue_task_count
                .with_label_values(&[queue.cleaned(), task])
                .set(*count);
        }
        self.reported_tasks
            .insert(queue.cleaned().to_string(), current);

        Ok(())
    }

    /// Drops the series of queues that aged out of the discovery cache
    /// entirely. While a queue is still cached it keeps its series at zero;
    /// once it is gone from the cache it disappears from the exposition too.
    fn forget_expired_queues(&mut self, current: &HashSet<QueueName>) {
        let live: HashSet<&str> = current.iter().map(QueueName::cleaned).collect();
        let expired: Vec<String> = self
            .reported_tasks
            .keys()
            .filter(|name| !live.contains(name.as_str()))
            .cloned()
            .collect();

        for name in expired {
            debug!("Queue '{}' expired from the cache, dropping its series", name);
            let _ = self.metrics.queue_length.remove_label_values(&[&name]);
            if let Some(tasks) = self.reported_tasks.remove(&name) {
                for task in tasks {
                    let _ = self
                        .metrics
                        .queue_task_count
                        .remove_label_values(&[&name, &task]);
                }
            }
        }
    }
}

/// Extracts the cleaned task name from one backlog item. Items are JSON
/// objects with a `task` field; anything else stays anonymous (counted in
/// the queue length, absent from the per-task series).
fn task_name_of(item: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(item).ok()?;
    let task = value.get("task")?.as_str()?;
    Some(names::clean_task_name(task).to_string())
}
