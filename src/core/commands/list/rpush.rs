// src/core/commands/list/rpush.rs

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::parse_key_and_values;
use crate::core::protocol::RespFrame;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct RPush {
    pub key: Bytes,
    pub values: Vec<Bytes>,
}

impl ParseCommand for RPush {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        let (key, values) = parse_key_and_values(args, 2, "RPUSH")?;
        Ok(RPush { key, values })
    }
}

#[async_trait]
impl ExecutableCommand for RPush {
    /// Tail-appends the values in argument order, creating the list on first
    /// push, and replies the new length.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let new_len = ctx.state.lists.rpush(&self.key, self.values.clone());
        Ok(RespFrame::Integer(new_len as i64))
    }
}
