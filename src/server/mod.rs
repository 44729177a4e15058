// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod connection_loop;
mod context;
mod initialization;

pub use context::ServerContext;
pub use initialization::setup;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Initialize server state, the dispatcher and the listener.
    let server_context = initialization::setup(config).await?;

    // 2. Start the main connection acceptance loop. This runs until shutdown.
    serve(server_context).await;

    Ok(())
}

/// Runs the accept loop on an already-initialized context. Split from `run`
/// so tests can bind to an ephemeral port and learn it before serving.
pub async fn serve(ctx: ServerContext) {
    connection_loop::run(ctx).await;
}
