// src/server/context.rs

use crate::config::Config;
use crate::core::discovery::QueueDiscovery;
use crate::core::metrics::ExporterMetrics;
use crate::core::store::QueueStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the exporter.
pub struct ExporterContext {
    pub config: Config,
    pub store: Arc<dyn QueueStore>,
    pub discovery: Arc<QueueDiscovery>,
    pub metrics: Arc<ExporterMetrics>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
