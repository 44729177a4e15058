// src/core/commands/streams/xadd.rs

//! Implements the `XADD` command for appending entries to a stream.
//!
//! # Command Syntax
//! `XADD key <* | ms-* | ms[-seq]> field value [field value ...]`
//!
//! The id argument selects how the entry id is generated: `*` lets the server
//! pick both parts from its clock, `ms-*` fixes the timestamp and lets the
//! server pick the sequence number, and an explicit `ms-seq` (or bare `ms`,
//! sequence 0) is validated against the stream's current top item.
//!
//! # Return Value
//! A Bulk String holding the `ms-seq` id of the newly appended entry, or an
//! error when the id is `0-0`, not strictly greater than the top item, or
//! unparsable.

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{extract_bytes, extract_string};
use crate::core::protocol::RespFrame;
use crate::core::storage::{EntryIdSpec, StreamId};
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct XAdd {
    pub key: Bytes,
    pub id_spec: EntryIdSpec,
    pub fields: IndexMap<Bytes, Bytes>,
}

/// Parses the id argument of `XADD`: `*`, `<ms>-*`, `<ms>` or `<ms>-<seq>`.
pub fn parse_entry_id_spec(s: &str) -> Result<EntryIdSpec, OpalDBError> {
    if s == "*" {
        return Ok(EntryIdSpec::Auto);
    }
    if let Some(ms) = s.strip_suffix("-*") {
        let ms = ms.parse().map_err(|_| OpalDBError::InvalidStreamId)?;
        return Ok(EntryIdSpec::PartialMs(ms));
    }
    s.parse::<StreamId>().map(EntryIdSpec::Explicit)
}

impl ParseCommand for XAdd {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        if args.len() < 4 {
            return Err(OpalDBError::WrongArgumentCount("XADD".to_string()));
        }
        let key = extract_bytes(&args[0])?;
        let id_spec = parse_entry_id_spec(&extract_string(&args[1])?)?;

        // The field-value arguments must pair up.
        let field_args = &args[2..];
        if field_args.is_empty() || field_args.len() % 2 != 0 {
            return Err(OpalDBError::WrongArgumentCount("XADD".to_string()));
        }
        let fields = field_args
            .chunks_exact(2)
            .map(|chunk| Ok((extract_bytes(&chunk[0])?, extract_bytes(&chunk[1])?)))
            .collect::<Result<_, OpalDBError>>()?;

        Ok(XAdd {
            key,
            id_spec,
            fields,
        })
    }
}

#[async_trait]
impl ExecutableCommand for XAdd {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let now_ms = ctx.state.now_ms();
        let new_id =
            ctx.state
                .streams
                .append(&self.key, self.id_spec, self.fields.clone(), now_ms)?;

        // The engine lock is released by now; wake any blocked XREAD clients.
        ctx.state.stream_blockers.notify(&self.key);

        Ok(RespFrame::BulkString(new_id.to_string().into()))
    }
}
