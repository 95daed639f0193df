// src/server/spawner.rs

//! Spawns the exporter's long-running background tasks.

use super::context::ExporterContext;
use super::metrics_server;
use crate::core::listener::{EventDispatcher, ListenerLoop};
use crate::core::sampler::QueueSampler;
use tracing::info;

/// Spawns the metrics endpoint, the queue sampler, and the event listener
/// onto the context's `JoinSet`, each with its own shutdown receiver.
pub fn spawn_all(ctx: &mut ExporterContext) {
    let host = ctx.config.host.clone();
    let port = ctx.config.port;
    let metrics = ctx.metrics.clone();
    let shutdown_rx = ctx.shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        metrics_server::run_metrics_server(host, port, metrics, shutdown_rx).await
    });

    let sampler = QueueSampler::new(
        ctx.store.clone(),
        ctx.discovery.clone(),
        ctx.metrics.clone(),
        ctx.config.sampler.interval,
    );
    let shutdown_rx = ctx.shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        sampler.run(shutdown_rx).await;
        Ok(())
    });

    let listener = ListenerLoop::new(
        ctx.store.clone(),
        ctx.discovery.clone(),
        EventDispatcher::new(ctx.metrics.clone()),
        ctx.config.listener.drain_cycle,
        ctx.config.listener.receive_timeout,
    );
    let shutdown_rx = ctx.shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        listener.run(shutdown_rx).await;
        Ok(())
    });

    info!("All background tasks have been spawned.");
}
