// src/server/metrics_server.rs

use crate::core::metrics::ExporterMetrics;
use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Handles HTTP requests to the /metrics endpoint.
async fn metrics_handler(metrics: Arc<ExporterMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode Prometheus metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; version=0.0.4")],
                String::new(),
            )
        }
    }
}

/// Runs the HTTP server exposing Prometheus metrics on /metrics.
pub async fn run_metrics_server(
    host: String,
    port: u16,
    metrics: Arc<ExporterMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = Router::new().route("/metrics", get(move || metrics_handler(metrics.clone())));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind metrics server on {host}:{port}"))?;

    info!(
        "Prometheus metrics server listening on http://{}/metrics",
        listener
            .local_addr()
            .context("Failed to read metrics server address")?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Metrics server shutting down.");
        })
        .await
        .context("Metrics server failed")?;

    Ok(())
}
