// src/core/commands/string/get.rs

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{extract_bytes, validate_arg_count};
use crate::core::protocol::RespFrame;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Get {
    pub key: Bytes,
}

impl ParseCommand for Get {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        validate_arg_count(args, 1, "GET")?;
        Ok(Get {
            key: extract_bytes(&args[0])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for Get {
    /// A missing or expired record replies the null bulk string. Reading an
    /// expired record purges it as a side effect.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let now_ms = ctx.state.now_ms();
        match ctx.state.kv.get(&self.key, now_ms) {
            Some(value) => Ok(RespFrame::BulkString(value)),
            None => Ok(RespFrame::Null),
        }
    }
}
