// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::ConnectionGuard;
use crate::core::dispatcher::{DispatcherHandle, UnitOfWork};
use crate::core::protocol::{RespFrame, RespFrameCodec};
use crate::core::state::ServerState;
use crate::core::{Command, OpalDBError};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Manages the full lifecycle of a client connection: a framed read loop
/// that submits one unit of work per request and awaits its reply before
/// reading the next frame, so replies are strictly serialised per connection.
pub struct ConnectionHandler {
    framed: Framed<TcpStream, RespFrameCodec>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    dispatcher: DispatcherHandle,
    session_id: u64,
    cancel: CancellationToken,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        state: Arc<ServerState>,
        dispatcher: DispatcherHandle,
        session_id: u64,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, RespFrameCodec),
            addr,
            state,
            dispatcher,
            session_id,
            cancel: CancellationToken::new(),
            shutdown_rx,
        }
    }

    /// The main event loop for the connection, handling incoming frames and signals.
    pub async fn run(&mut self) -> Result<(), OpalDBError> {
        let _guard = ConnectionGuard::new(
            self.state.clone(),
            self.session_id,
            self.addr,
            self.cancel.clone(),
        );

        loop {
            tokio::select! {
                // Prioritize the shutdown signal over new frames.
                biased;
                _ = self.shutdown_rx.recv() => {
                    debug!("Connection handler for {} received shutdown signal.", self.addr);
                    let _ = self
                        .framed
                        .send(RespFrame::Error("SHUTDOWN Server is shutting down".to_string()))
                        .await;
                    return Ok(());
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(frame)) => {
                            debug!("Session {}: received frame: {:?}", self.session_id, frame);
                            self.process_frame(frame).await?;
                        }
                        Some(Err(e)) => {
                            // A protocol-level failure leaves the byte stream
                            // in an unknown state: report it when possible,
                            // then drop the connection.
                            warn!("Protocol error on connection {}: {}", self.addr, e);
                            let _ = self.framed.send(RespFrame::Error(e.to_string())).await;
                            return Err(e);
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Parses a request frame, submits it to the dispatcher, and writes the
    /// reply. Command-level failures are reported without closing the
    /// connection and without touching the engines.
    async fn process_frame(&mut self, frame: RespFrame) -> Result<(), OpalDBError> {
        let command = match Command::try_from(frame) {
            Ok(command) => command,
            Err(e) if e.is_fatal() => {
                let _ = self.framed.send(RespFrame::Error(e.to_string())).await;
                return Err(e);
            }
            Err(e) => {
                self.framed.send(RespFrame::Error(e.to_string())).await?;
                return Ok(());
            }
        };

        debug!(
            "Session {}: dispatching command '{}'",
            self.session_id,
            command.name()
        );

        let (reply_tx, reply_rx) = oneshot::channel();
        let unit = UnitOfWork {
            command,
            session_id: self.session_id,
            cancel: self.cancel.clone(),
            reply_tx,
        };
        // Back-pressure: a full main queue suspends this connection task.
        self.dispatcher.submit(unit).await?;

        let reply = tokio::select! {
            biased;
            _ = self.shutdown_rx.recv() => {
                debug!("Session {}: shutdown while awaiting reply.", self.session_id);
                self.cancel.cancel();
                return Err(OpalDBError::Internal("server shutting down".to_string()));
            }
            reply = reply_rx => reply,
        };

        match reply {
            Ok(Ok(reply_frame)) => {
                self.framed.send(reply_frame).await?;
                Ok(())
            }
            Ok(Err(e)) => {
                if let OpalDBError::Internal(detail) = &e {
                    warn!("Session {}: internal error: {}", self.session_id, detail);
                }
                self.framed.send(RespFrame::Error(e.to_string())).await?;
                Ok(())
            }
            // The dispatcher dropped the reply sender: the unit was cancelled
            // or the server is going down. Nothing sensible left to send.
            Err(_) => Err(OpalDBError::Internal(
                "dispatcher dropped the reply".to_string(),
            )),
        }
    }
}
