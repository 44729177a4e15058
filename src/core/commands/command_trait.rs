// src/core/commands/command_trait.rs

//! Defines the core traits for all executable commands.

use crate::core::protocol::RespFrame;
use crate::core::state::ServerState;
use crate::core::OpalDBError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a command needs while executing: the shared server state, the
/// identity of the issuing session, and a cancellation token tied to that
/// session's connection. Blocking commands watch the token so a disconnect
/// releases them without producing a reply.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub state: Arc<ServerState>,
    pub session_id: u64,
    pub cancel: CancellationToken,
}

/// A trait for the actual execution logic of a command.
/// Implemented by each command's struct (e.g., `Get`, `Set`).
#[async_trait]
pub trait ExecutableCommand {
    /// The core logic for the command's execution.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError>;
}

/// A trait for parsing a command's arguments from a slice of `RespFrame`.
pub trait ParseCommand: Sized {
    /// Parses the arguments and returns an instance of the command struct.
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError>;
}
