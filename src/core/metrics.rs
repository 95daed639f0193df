// src/core/metrics.rs

//! The exporter's metric families.
//!
//! Everything lives in an explicitly constructed [`prometheus::Registry`]
//! owned by [`ExporterMetrics`]. The handle is passed to the dispatcher, the
//! sampler, and the HTTP endpoint at assembly time, so every instance (and
//! every test) gets an isolated registry.

use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Histogram buckets for task durations, from sub-second jobs up to slow
/// multi-minute batches.
const DURATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0,
];

pub struct ExporterMetrics {
    registry: Registry,

    /// Tasks enqueued, by queue and task.
    pub enqueued_tasks: IntCounterVec,
    /// Tasks picked up by a worker, by queue and task.
    pub started_tasks: IntCounterVec,
    /// Tasks completed successfully, by queue and task.
    pub finished_tasks: IntCounterVec,
    /// Tasks that raised an error, by queue and task.
    pub error_tasks: IntCounterVec,
    /// Wall time workers spent executing tasks.
    pub task_duration_seconds: HistogramVec,
    /// Backlog length per queue.
    pub queue_length: IntGaugeVec,
    /// Backlog composition per queue, broken down by task.
    pub queue_task_count: IntGaugeVec,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let enqueued_tasks = IntCounterVec::new(
            Opts::new("huey_enqueued_tasks", "Huey tasks enqueued."),
            &["queue_name", "task_name"],
        )?;
        let started_tasks = IntCounterVec::new(
            Opts::new("huey_started_tasks", "Huey tasks picked up by a worker."),
            &["queue_name", "task_name"],
        )?;
        let finished_tasks = IntCounterVec::new(
            Opts::new("huey_finished_tasks", "Huey tasks completed successfully."),
            &["queue_name", "task_name"],
        )?;
        let error_tasks = IntCounterVec::new(
            Opts::new("huey_error_tasks", "Huey tasks that raised an error."),
            &["queue_name", "task_name"],
        )?;
        let task_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "huey_task_duration_seconds",
                "Wall time spent executing Huey tasks.",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["queue_name", "task_name"],
        )?;
        let queue_length = IntGaugeVec::new(
            Opts::new("huey_queue_length", "Pending items per queue."),
            &["queue_name"],
        )?;
        let queue_task_count = IntGaugeVec::new(
            Opts::new(
                "huey_queue_task_count",
                "Pending items per queue, broken down by task.",
            ),
            &["queue_name", "task_name"],
        )?;

        registry.register(Box::new(enqueued_tasks.clone()))?;
        registry.register(Box::new(started_tasks.clone()))?;
        registry.register(Box::new(finished_tasks.clone()))?;
        registry.register(Box::new(error_tasks.clone()))?;
        registry.register(Box::new(task_duration_seconds.clone()))?;
        registry.register(Box::new(queue_length.clone()))?;
        registry.register(Box::new(queue_task_count.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            enqueued_tasks,
            started_tasks,
            finished_tasks,
            error_tasks,
            task_duration_seconds,
            queue_length,
            queue_task_count,
        })
    }

    /// Renders every registered family in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&self.registry.gather())
    }
}
