// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An RAII guard to ensure connection resources are always cleaned up when a
/// connection handler's scope is exited, however it exits: the session's
/// cancellation token fires (releasing any blocked unit without a reply) and
/// its stream waiters are swept out of the registry.
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    session_id: u64,
    addr: SocketAddr,
    cancel: CancellationToken,
}

impl ConnectionGuard {
    pub(crate) fn new(
        state: Arc<ServerState>,
        session_id: u64,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            session_id,
            addr,
            cancel,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {}",
            self.addr
        );

        // Pending and blocked units belonging to this connection observe the
        // cancellation and terminate without producing replies.
        self.cancel.cancel();

        // Clean up any lingering waiters from blocking stream reads.
        self.state
            .stream_blockers
            .remove_waiters_for_session(self.session_id);
    }
}
