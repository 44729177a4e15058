// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::ConnectionHandler;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

// Platform-specific signal handling imports
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Waits for a shutdown signal based on the operating system.
/// On Unix, it listens for SIGINT and SIGTERM.
/// On Windows, it listens for Ctrl+C.
async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to create SIGINT stream");
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to create SIGTERM stream");
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
            _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Ctrl-C received, initiating graceful shutdown.");
    }
}

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(ctx: ServerContext) {
    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased; // Prioritize shutdown signals over other events.

            // Wait for a shutdown signal.
            _ = await_shutdown_signal() => {
                break;
            },

            // Accept new incoming TCP connections.
            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                            warn!("Connection limit reached; rejecting {}", addr);
                            continue;
                        };
                        info!("Accepted new connection from: {}", addr);

                        session_id_counter = session_id_counter.wrapping_add(1);
                        let session_id = session_id_counter;
                        let state = ctx.state.clone();
                        let dispatcher = ctx.dispatcher.clone();
                        let shutdown_rx = ctx.shutdown_tx.subscribe();

                        client_tasks.spawn(async move {
                            let mut handler = ConnectionHandler::new(
                                socket, addr, state, dispatcher, session_id, shutdown_rx,
                            );
                            if let Err(e) = handler.run().await {
                                warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                            }
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            },

            // Reap completed client tasks.
            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    // --- Graceful Shutdown Sequence ---
    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No tasks were subscribed to the shutdown signal.");
    }

    client_tasks.shutdown().await;
    info!("All client connections closed.");

    if tokio::time::timeout(Duration::from_secs(10), ctx.dispatcher_task)
        .await
        .is_err()
    {
        warn!("Timed out waiting for the dispatcher to finish cleanly.");
    }
    info!("Server shutdown complete.");
}
