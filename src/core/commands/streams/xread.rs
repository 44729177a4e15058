// src/core/commands/streams/xread.rs

//! Implements the `XREAD` command for reading entries from one or more
//! streams, optionally blocking until data arrives.
//!
//! # Command Syntax
//! `XREAD [BLOCK milliseconds] STREAMS key [key ...] id [id ...]`
//!
//! Each id is the *exclusive* lower bound for its stream: only entries with a
//! strictly greater id are returned. The special id `$` stands for the
//! stream's current top item, i.e. "only entries appended after this call".
//!
//! With `BLOCK 0` the command waits indefinitely; with a positive timeout it
//! replies the null array once the deadline passes. With several streams, the
//! command replies as soon as any of them holds matching entries; streams
//! without matches contribute nothing to the reply, and no matches anywhere
//! is the null array.

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{extract_bytes, extract_string};
use crate::core::protocol::RespFrame;
use crate::core::state::ServerState;
use crate::core::storage::{StreamEntry, StreamId};
use crate::core::stream_blocking::StreamWaitOutcome;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;

/// The blocking policy of an `XREAD` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockPolicy {
    /// No `BLOCK` option: reply immediately, matches or not.
    #[default]
    None,
    /// `BLOCK <ms>` with a positive timeout.
    WaitMillis(u64),
    /// `BLOCK 0`: wait until data arrives or the connection goes away.
    WaitForever,
}

/// The starting id for one stream of an `XREAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFrom {
    /// An explicit id; entries strictly greater match.
    Exact(StreamId),
    /// `$`: whatever the stream's top item is when the call begins.
    Latest,
}

#[derive(Debug, Clone, Default)]
pub struct XRead {
    pub streams: Vec<(Bytes, ReadFrom)>,
    pub block: BlockPolicy,
}

impl XRead {
    /// Whether this call may suspend and therefore needs a worker slot.
    pub fn is_blocking(&self) -> bool {
        !matches!(self.block, BlockPolicy::None)
    }
}

impl ParseCommand for XRead {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        let mut cmd = XRead::default();
        let mut i = 0;
        let mut saw_streams = false;

        // Parse options up to the STREAMS keyword.
        while i < args.len() {
            let arg_str = extract_string(&args[i])?;
            match arg_str.to_ascii_lowercase().as_str() {
                "block" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(OpalDBError::SyntaxError);
                    }
                    let ms: u64 = extract_string(&args[i])?
                        .parse()
                        .map_err(|_| OpalDBError::NotAnInteger)?;
                    cmd.block = if ms == 0 {
                        BlockPolicy::WaitForever
                    } else {
                        BlockPolicy::WaitMillis(ms)
                    };
                    i += 1;
                }
                "streams" => {
                    i += 1;
                    saw_streams = true;
                    break;
                }
                _ => return Err(OpalDBError::SyntaxError),
            }
        }
        if !saw_streams {
            return Err(OpalDBError::SyntaxError);
        }

        // The remainder is `key... id...`, split evenly down the middle.
        let remaining = &args[i..];
        if remaining.is_empty() || remaining.len() % 2 != 0 {
            return Err(OpalDBError::WrongArgumentCount("XREAD".to_string()));
        }
        let num_streams = remaining.len() / 2;
        let keys = &remaining[..num_streams];
        let ids = &remaining[num_streams..];

        for (key_frame, id_frame) in keys.iter().zip(ids.iter()) {
            let key = extract_bytes(key_frame)?;
            let id_str = extract_string(id_frame)?;
            let from = if id_str == "$" {
                ReadFrom::Latest
            } else {
                ReadFrom::Exact(id_str.parse::<StreamId>()?)
            };
            cmd.streams.push((key, from));
        }

        Ok(cmd)
    }
}

#[async_trait]
impl ExecutableCommand for XRead {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        // Resolve every `$` against the stream's top item once, up front.
        // Later rescans reuse the resolved ids, so entries appended while the
        // call is blocked are matched against the state at call begin.
        let resolved: Vec<(Bytes, StreamId)> = self
            .streams
            .iter()
            .map(|(key, from)| {
                let after = match from {
                    ReadFrom::Exact(id) => *id,
                    ReadFrom::Latest => ctx.state.streams.last_id(key).unwrap_or_default(),
                };
                (key.clone(), after)
            })
            .collect();

        // --- Phase 1: initial scan ---
        let results = collect_matches(&ctx.state, &resolved);
        if !results.is_empty() || !self.is_blocking() {
            return Ok(format_results(results));
        }

        // --- Phase 2: register, rescan, suspend ---
        let keys: Vec<Bytes> = resolved.iter().map(|(k, _)| k.clone()).collect();
        let deadline = match self.block {
            BlockPolicy::WaitMillis(ms) => Some(Instant::now() + Duration::from_millis(ms)),
            _ => None,
        };

        loop {
            let waiter = ctx.state.stream_blockers.register(&keys, ctx.session_id);

            // Rescan after registering: an append that slipped in between the
            // previous scan and the registration is caught here instead of
            // being lost with its notification.
            let results = collect_matches(&ctx.state, &resolved);
            if !results.is_empty() {
                waiter.deregister();
                return Ok(format_results(results));
            }

            let remaining = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if d <= now {
                        waiter.deregister();
                        return Ok(RespFrame::NullArray);
                    }
                    Some(d - now)
                }
                None => None,
            };

            match waiter.wait(remaining, &ctx.cancel).await {
                // A notification fired; loop around and rescan.
                StreamWaitOutcome::Woken => continue,
                StreamWaitOutcome::TimedOut => return Ok(RespFrame::NullArray),
                // The dispatcher suppresses the reply of a cancelled unit;
                // the value returned here never reaches a client.
                StreamWaitOutcome::Cancelled => return Ok(RespFrame::NullArray),
            }
        }
    }
}

/// Scans every (key, after-id) pair and keeps the pairs that produced
/// matches. Order follows the order of the request.
fn collect_matches(
    state: &ServerState,
    resolved: &[(Bytes, StreamId)],
) -> Vec<(Bytes, Vec<StreamEntry>)> {
    let mut results = Vec::new();
    for (key, after) in resolved {
        let entries = state.streams.entries_after(key, *after);
        if !entries.is_empty() {
            results.push((key.clone(), entries));
        }
    }
    results
}

/// Formats the reply: an array of `[stream-key, [entry, ...]]` pairs, or the
/// null array when nothing matched anywhere.
fn format_results(results: Vec<(Bytes, Vec<StreamEntry>)>) -> RespFrame {
    if results.is_empty() {
        return RespFrame::NullArray;
    }
    let streams = results
        .into_iter()
        .map(|(stream_name, entries)| {
            let entry_values: Vec<RespFrame> = entries.iter().map(super::format_entry).collect();
            RespFrame::Array(vec![
                RespFrame::BulkString(stream_name),
                RespFrame::Array(entry_values),
            ])
        })
        .collect();
    RespFrame::Array(streams)
}
