// src/core/errors.rs

//! Defines the primary error enum for the exporter.

use thiserror::Error;

/// The set of failures the exporter's loops and setup paths can produce.
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Subscription error: {0}")]
    Subscribe(String),

    #[error("Refusing to subscribe to an empty channel set")]
    EmptySubscription,

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<redis::RedisError> for ExporterError {
    fn from(e: redis::RedisError) -> Self {
        ExporterError::Store(e.to_string())
    }
}
