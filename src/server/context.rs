// src/server/context.rs

use crate::core::dispatcher::DispatcherHandle;
use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinHandle;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<ServerState>,
    pub dispatcher: DispatcherHandle,
    pub dispatcher_task: JoinHandle<()>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub connection_permits: Arc<Semaphore>,
}
