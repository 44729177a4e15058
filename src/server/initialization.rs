// src/server/initialization.rs

//! Handles the server initialization process: state setup, the dispatcher
//! task, and the TCP listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::dispatcher::Dispatcher;
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tracing::info;

/// Initializes all server components before starting the accept loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    info!(
        "OpalDB version {} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    let (shutdown_tx, _) = broadcast::channel(1);

    let state = ServerState::new(config);
    info!("Server state initialized.");

    let (dispatcher, dispatcher_handle) = Dispatcher::new(state.clone(), shutdown_tx.subscribe());
    let dispatcher_task = tokio::spawn(dispatcher.run());
    info!(
        "Dispatcher started (worker pool: {}, queue depth: {}).",
        state.config.worker_pool_size, state.config.queue_depth
    );

    // A bind failure here is fatal; `main` reports it and exits non-zero.
    let listener = TcpListener::bind((state.config.host.as_str(), state.config.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind to {}:{}",
                state.config.host, state.config.port
            )
        })?;
    info!(
        "OpalDB server listening on {}:{}",
        state.config.host, state.config.port
    );
    let connection_permits = Arc::new(Semaphore::new(state.config.max_clients));

    Ok(ServerContext {
        state,
        dispatcher: dispatcher_handle,
        dispatcher_task,
        listener,
        shutdown_tx,
        connection_permits,
    })
}
