// src/core/listener/dispatcher.rs

//! Turns raw channel payloads into metric updates.

use crate::core::events::TaskEvent;
use crate::core::metrics::ExporterMetrics;
use std::sync::Arc;
use tracing::debug;

/// Stateless bridge from parsed events to the metric families. Parse
/// failures are logged and dropped; nothing escapes [`handle`].
///
/// [`handle`]: EventDispatcher::handle
pub struct EventDispatcher {
    metrics: Arc<ExporterMetrics>,
}

impl EventDispatcher {
    pub fn new(metrics: Arc<ExporterMetrics>) -> Self {
        Self { metrics }
    }

    /// Processes one payload received on `channel`. The channel name carries
    /// the queue identity; the payload never does.
    pub fn handle(&self, channel: &str, payload: &[u8]) {
        let event = match TaskEvent::parse(payload) {
            Ok(event) => event,
            Err(reason) => {
                debug!("Ignored event on channel '{}': {}", channel, reason);
                return;
            }
        };

        debug!(
            "Received '{}' event for task '{}' on queue '{}' (environment: {})",
            event.status(),
            event.task(),
            channel,
            event.environment().unwrap_or("-"),
        );

        let labels = [channel, event.task()];
        match &event {
            TaskEvent::Enqueued { .. } => {
                self.metrics.enqueued_tasks.with_label_values(&labels).inc();
            }
            TaskEvent::Started { .. } => {
                self.metrics.started_tasks.with_label_values(&labels).inc();
            }
            TaskEvent::Finished {
                duration_seconds, ..
            } => {
                self.metrics.finished_tasks.with_label_values(&labels).inc();
                self.metrics
                    .task_duration_seconds
                    .with_label_values(&labels)
                    .observe(*duration_seconds);
            }
            TaskEvent::Error { .. } => {
                self.metrics.error_tasks.with_label_values(&labels).inc();
            }
        }
    }
}
