// src/config.rs

//! Exporter configuration: file loading, environment overrides, validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Backlog sampling settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SamplerConfig {
    /// How often queue backlogs are measured.
    #[serde(with = "humantime_serde", default = "default_sampler_interval")]
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: default_sampler_interval(),
        }
    }
}

/// Event listener settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListenerConfig {
    /// How long events are drained before the queue set is re-checked.
    #[serde(with = "humantime_serde", default = "default_drain_cycle")]
    pub drain_cycle: Duration,

    /// Upper bound on a single pub/sub poll, so the drain cycle stays
    /// responsive when no events arrive.
    #[serde(with = "humantime_serde", default = "default_receive_timeout")]
    pub receive_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            drain_cycle: default_drain_cycle(),
            receive_timeout: default_receive_timeout(),
        }
    }
}

/// The exporter's runtime configuration, loaded from a TOML file with
/// environment and command-line overrides applied on top.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Connection string to the store, including the database
    /// (for example `redis://localhost:6379/0`).
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Bind address of the metrics HTTP endpoint.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the metrics HTTP endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long a discovered queue keeps being reported after its key
    /// disappeared from the store.
    #[serde(with = "humantime_serde", default = "default_queue_cache_ttl")]
    pub queue_cache_ttl: Duration,

    #[serde(default)]
    pub sampler: SamplerConfig,

    #[serde(default)]
    pub listener: ListenerConfig,
}

fn default_connection_string() -> String {
    "redis://localhost:6379".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_sampler_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_drain_cycle() -> Duration {
    Duration::from_secs(30)
}

fn default_receive_timeout() -> Duration {
    Duration::from_millis(300)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            queue_cache_ttl: default_queue_cache_ttl(),
            sampler: SamplerConfig::default(),
            listener: ListenerConfig::default(),
        }
    }
}

impl Config {
    /// Creates a `Config` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;

        config.validate()?;
        Ok(config)
    }

    /// Applies the environment overrides: `REDIS_CONNECTION_STRING`,
    /// `EXPORTER_PORT`, and `LOGGING_LEVEL`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(connection_string) = std::env::var("REDIS_CONNECTION_STRING") {
            self.connection_string = connection_string;
        }
        if let Ok(port) = std::env::var("EXPORTER_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("Invalid EXPORTER_PORT value '{port}'"))?;
        }
        if let Ok(level) = std::env::var("LOGGING_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validates the configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.connection_string.trim().is_empty() {
            return Err(anyhow!("connection_string cannot be empty"));
        }
        if self.queue_cache_ttl.is_zero() {
            return Err(anyhow!("queue_cache_ttl cannot be 0"));
        }
        if self.sampler.interval.is_zero() {
            return Err(anyhow!("sampler.interval cannot be 0"));
        }
        if self.listener.drain_cycle.is_zero() {
            return Err(anyhow!("listener.drain_cycle cannot be 0"));
        }
        if self.listener.receive_timeout.is_zero() {
            return Err(anyhow!("listener.receive_timeout cannot be 0"));
        }
        if self.listener.receive_timeout >= self.listener.drain_cycle {
            return Err(anyhow!(
                "listener.receive_timeout must be shorter than listener.drain_cycle"
            ));
        }
        Ok(())
    }
}
