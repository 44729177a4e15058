// src/config.rs

//! Manages server configuration: loading from a TOML file with per-field
//! defaults, so the server runs usefully with no file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The server configuration. Every field has a default, and unknown fields in
/// the file are rejected to catch typos early.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The address the listener binds to.
    pub host: String,
    /// The TCP port the listener binds to.
    pub port: u16,
    /// The default tracing filter; `RUST_LOG` overrides it.
    pub log_level: String,
    /// Maximum simultaneously accepted connections.
    pub max_clients: usize,
    /// Number of worker slots for blocking commands.
    pub worker_pool_size: usize,
    /// Capacity of the dispatcher's main and callback queues.
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            worker_pool_size: default_worker_pool_size(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    6379
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    10_000
}
fn default_worker_pool_size() -> usize {
    10
}
fn default_queue_depth() -> usize {
    10
}

impl Config {
    /// Loads the configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        Ok(config)
    }

    /// Loads the configuration from `path` when the file exists, otherwise
    /// falls back to the built-in defaults. Parse errors are still fatal; a
    /// present-but-broken file should never be silently ignored.
    pub fn from_file_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
