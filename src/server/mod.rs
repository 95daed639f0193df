// src/server/mod.rs

//! Process assembly: store connection, task spawning, and supervision.

mod context;
mod metrics_server;
mod spawner;

pub use context::ExporterContext;

use crate::config::Config;
use crate::core::discovery::QueueDiscovery;
use crate::core::metrics::ExporterMetrics;
use crate::core::store::{QueueStore, RedisStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How long shutdown waits for background tasks before giving up.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The main entry point: connects to the store, spawns every background
/// task, and supervises them until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    info!(
        "Connecting to store at {}",
        crate::core::store::redis::redact_url(&config.connection_string)
    );
    let store = RedisStore::connect(&config.connection_string)
        .await
        .context("Failed to connect to the store")?;

    let ctx = setup(config, Arc::new(store))?;
    supervise(ctx).await
}

/// Builds the shared state and spawns the background tasks, generic over the
/// store backend.
pub fn setup(config: Config, store: Arc<dyn QueueStore>) -> Result<ExporterContext> {
    let metrics = Arc::new(ExporterMetrics::new().context("Failed to build metric families")?);
    let discovery = Arc::new(QueueDiscovery::new(store.clone(), config.queue_cache_ttl));
    let (shutdown_tx, _) = broadcast::channel(1);

    let mut ctx = ExporterContext {
        config,
        store,
        discovery,
        metrics,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    };
    spawner::spawn_all(&mut ctx);
    Ok(ctx)
}

/// Supervises the background tasks and coordinates graceful shutdown.
async fn supervise(mut ctx: ExporterContext) -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
                break;
            }

            Some(result) = ctx.background_tasks.join_next() => {
                match result {
                    Ok(Ok(())) => {
                        warn!("A background task finished unexpectedly.");
                    }
                    Ok(Err(e)) => {
                        error!("Background task failed: {}. Shutting down.", e);
                        break;
                    }
                    Err(e) => {
                        error!("Background task panicked: {}. Shutting down.", e);
                        break;
                    }
                }
            }
        }
    }

    shutdown(ctx).await;
    Ok(())
}

/// Signals every task and waits for them to finish, bounded by
/// [`SHUTDOWN_GRACE`].
async fn shutdown(mut ctx: ExporterContext) {
    info!("Signaling all background tasks to stop.");
    if ctx.shutdown_tx.send(()).is_err() {
        warn!("No background task was listening for the shutdown signal.");
    }

    let drain = async {
        while ctx.background_tasks.join_next().await.is_some() {}
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("Timed out waiting for background tasks to finish.");
    }

    info!("Exporter shutdown complete.");
}
