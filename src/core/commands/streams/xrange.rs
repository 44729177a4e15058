// src/core/commands/streams/xrange.rs

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{extract_bytes, extract_string, validate_arg_count};
use crate::core::protocol::RespFrame;
use crate::core::storage::StreamId;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct XRange {
    pub key: Bytes,
    pub start: StreamId,
    pub end: StreamId,
}

/// `-` is the open lower bound; a bare `<ms>` defaults the sequence to 0.
fn parse_range_start(s: &str) -> Result<StreamId, OpalDBError> {
    if s == "-" {
        Ok(StreamId::MIN)
    } else {
        s.parse::<StreamId>()
    }
}

/// `+` is the open upper bound; a bare `<ms>` covers every sequence number of
/// that millisecond, so its sequence defaults to the maximum.
fn parse_range_end(s: &str) -> Result<StreamId, OpalDBError> {
    if s == "+" {
        Ok(StreamId::MAX)
    } else if s.contains('-') {
        s.parse::<StreamId>()
    } else {
        let ms = s.parse().map_err(|_| OpalDBError::InvalidStreamId)?;
        Ok(StreamId::new(ms, u64::MAX))
    }
}

impl ParseCommand for XRange {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        validate_arg_count(args, 3, "XRANGE")?;
        Ok(XRange {
            key: extract_bytes(&args[0])?,
            start: parse_range_start(&extract_string(&args[1])?)?,
            end: parse_range_end(&extract_string(&args[2])?)?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for XRange {
    /// Replies the entries whose ids lie in `[start, end]`, both ends
    /// inclusive, in insertion order. A missing stream is an empty array.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let entries = ctx.state.streams.range(&self.key, self.start, self.end);
        let results = entries.iter().map(super::format_entry).collect();
        Ok(RespFrame::Array(results))
    }
}
