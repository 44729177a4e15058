// src/core/commands/mod.rs

//! This module defines all supported commands and the central `Command` enum
//! that encapsulates their parsed state.
//!
//! A client request arrives as a RESP array of bulk strings; the first
//! element is the verb (case-insensitive), the rest are verb-specific
//! arguments handed to the matching `ParseCommand` implementation.

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::extract_string;
use crate::core::protocol::RespFrame;
use crate::core::OpalDBError;
use async_trait::async_trait;

pub mod command_trait;
pub mod generic;
pub mod helpers;
pub mod list;
pub mod streams;
pub mod string;

pub use generic::{Echo, Ping, TypeInfo};
pub use list::RPush;
pub use streams::{XAdd, XRange, XRead};
pub use string::{Get, Set};

/// A fully parsed client command, ready for execution.
#[derive(Debug, Clone)]
pub enum Command {
    Ping(Ping),
    Echo(Echo),
    Get(Get),
    Set(Set),
    Type(TypeInfo),
    RPush(RPush),
    XAdd(XAdd),
    XRange(XRange),
    XRead(XRead),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping(_) => "ping",
            Command::Echo(_) => "echo",
            Command::Get(_) => "get",
            Command::Set(_) => "set",
            Command::Type(_) => "type",
            Command::RPush(_) => "rpush",
            Command::XAdd(_) => "xadd",
            Command::XRange(_) => "xrange",
            Command::XRead(_) => "xread",
        }
    }

    /// Whether this command may suspend mid-execution. Blocking units are
    /// routed onto the dispatcher's worker pool instead of running inline.
    /// Only `XREAD` with a `BLOCK` policy qualifies.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Command::XRead(xread) if xread.is_blocking())
    }
}

impl TryFrom<RespFrame> for Command {
    type Error = OpalDBError;

    /// Parses a request frame into a typed command. Parse failures are
    /// reported to the client without touching the engines.
    fn try_from(frame: RespFrame) -> Result<Self, Self::Error> {
        let RespFrame::Array(parts) = frame else {
            return Err(OpalDBError::ProtocolError(
                "expected an array of bulk strings".to_string(),
            ));
        };
        let Some((verb_frame, args)) = parts.split_first() else {
            return Err(OpalDBError::ProtocolError(
                "empty command array".to_string(),
            ));
        };
        let verb = extract_string(verb_frame)?;

        match verb.to_ascii_lowercase().as_str() {
            "ping" => Ping::parse(args).map(Command::Ping),
            "echo" => Echo::parse(args).map(Command::Echo),
            "get" => Get::parse(args).map(Command::Get),
            "set" => Set::parse(args).map(Command::Set),
            "type" => TypeInfo::parse(args).map(Command::Type),
            "rpush" => RPush::parse(args).map(Command::RPush),
            "xadd" => XAdd::parse(args).map(Command::XAdd),
            "xrange" => XRange::parse(args).map(Command::XRange),
            "xread" => XRead::parse(args).map(Command::XRead),
            _ => Err(OpalDBError::UnknownCommand(verb)),
        }
    }
}

#[async_trait]
impl ExecutableCommand for Command {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        match self {
            Command::Ping(cmd) => cmd.execute(ctx).await,
            Command::Echo(cmd) => cmd.execute(ctx).await,
            Command::Get(cmd) => cmd.execute(ctx).await,
            Command::Set(cmd) => cmd.execute(ctx).await,
            Command::Type(cmd) => cmd.execute(ctx).await,
            Command::RPush(cmd) => cmd.execute(ctx).await,
            Command::XAdd(cmd) => cmd.execute(ctx).await,
            Command::XRange(cmd) => cmd.execute(ctx).await,
            Command::XRead(cmd) => cmd.execute(ctx).await,
        }
    }
}
