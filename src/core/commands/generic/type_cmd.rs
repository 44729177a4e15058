// src/core/commands/generic/type_cmd.rs

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{extract_bytes, validate_arg_count};
use crate::core::protocol::RespFrame;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;

/// A command for getting the data type of a key.
/// Corresponds to the `TYPE` Redis command.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub key: Bytes,
}

impl ParseCommand for TypeInfo {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        validate_arg_count(args, 1, "TYPE")?;
        Ok(TypeInfo {
            key: extract_bytes(&args[0])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for TypeInfo {
    /// Probes the engines in a fixed order: KV, then streams, then lists.
    /// When a key exists in more than one engine the first hit wins; the
    /// order is observable behaviour, not an accident. An expired string
    /// record counts as absent.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let state = &ctx.state;
        let type_name = if state.kv.contains_live(&self.key, state.now_ms()) {
            "string"
        } else if state.streams.contains_key(&self.key) {
            "stream"
        } else if state.lists.contains_key(&self.key) {
            "list"
        } else {
            "none"
        };
        Ok(RespFrame::SimpleString(type_name.to_string()))
    }
}
