// src/main.rs

//! The main entry point for the OpalDB server application.

use anyhow::Result;
use opaldb::config::Config;
use opaldb::server;
use std::env;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    // Collect command-line arguments to decide the execution mode.
    let args: Vec<String> = env::args().collect();

    // Handle the --version flag.
    if args.contains(&"--version".to_string()) {
        println!("OpalDB version {VERSION}");
        return Ok(());
    }

    // Determine the configuration path. It can be provided via a --config
    // flag; otherwise it defaults to "config.toml", which is optional.
    let config_flag = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_result = match config_flag {
        Some(path) => Config::from_file(path),
        None => Config::from_file_or_default("config.toml"),
    };
    let mut config = match config_result {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // Override port if provided as a command-line argument.
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

    // Set up logging: timestamped lines on stdout, filter from the
    // environment with the configured level as the fallback.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_timer(ChronoLocal::new("[%Y-%m-%d %H:%M:%S]".to_string()))
        .with_target(false)
        .init();

    // A bind failure surfaces here and turns into a non-zero exit code.
    if let Err(e) = server::run(config).await {
        error!("Server runtime error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
