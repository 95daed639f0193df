// src/core/mod.rs

//! The central module containing the exporter's core logic: queue discovery,
//! the event listener, the backlog sampler, and the metric families they feed.

pub mod cache;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod listener;
pub mod metrics;
pub mod names;
pub mod sampler;
pub mod store;

pub use errors::ExporterError;
