// src/main.rs

//! The main entry point for the huey-exporter binary.

use anyhow::Result;
use huey_exporter::config::Config;
use huey_exporter::server;
use std::env;
use std::path::Path;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "huey-exporter.toml";

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("huey-exporter version {VERSION}");
        return Ok(());
    }

    // An explicit --config path must exist; the default path is optional so
    // the exporter also runs entirely on defaults and overrides.
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|index| args.get(index + 1));

    let mut config = match config_path {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{path}\": {e:#}");
                std::process::exit(1);
            }
        },
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            match Config::from_file(DEFAULT_CONFIG_PATH) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to load configuration from \"{DEFAULT_CONFIG_PATH}\": {e:#}");
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };

    // Environment first, then flags, then one final validation pass.
    if let Err(e) = config.apply_env_overrides() {
        eprintln!("Invalid environment override: {e:#}");
        std::process::exit(1);
    }

    // Override port if provided as a command-line argument
    if let Some(port_index) = args.iter().position(|arg| arg == "--port") {
        if let Some(port_str) = args.get(port_index + 1) {
            match port_str.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => {
                    eprintln!("Invalid port number: {port_str}");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("--port flag requires a value");
            std::process::exit(1);
        }
    }

    if let Some(index) = args.iter().position(|arg| arg == "--connection-string") {
        match args.get(index + 1) {
            Some(connection_string) => config.connection_string = connection_string.clone(),
            None => {
                eprintln!("--connection-string flag requires a value");
                std::process::exit(1);
            }
        }
    }

    if let Some(index) = args.iter().position(|arg| arg == "--logging-level") {
        match args.get(index + 1) {
            Some(level) => config.log_level = level.clone(),
            None => {
                eprintln!("--logging-level flag requires a value");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e:#}");
        std::process::exit(1);
    }

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = server::run(config).await {
        error!("Exporter runtime error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
