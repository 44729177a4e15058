// src/core/commands/string/set.rs

use crate::core::commands::command_trait::{ExecutableCommand, ExecutionContext, ParseCommand};
use crate::core::commands::helpers::{ArgParser, extract_bytes};
use crate::core::protocol::RespFrame;
use crate::core::OpalDBError;
use async_trait::async_trait;
use bytes::Bytes;

/// The TTL options for the `SET` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TtlOption {
    /// No TTL option was provided; the record does not expire.
    #[default]
    None,
    /// `EX <seconds>`
    Seconds(u64),
    /// `PX <milliseconds>`
    Milliseconds(u64),
}

#[derive(Debug, Clone, Default)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
    pub ttl: TtlOption,
}

impl ParseCommand for Set {
    fn parse(args: &[RespFrame]) -> Result<Self, OpalDBError> {
        if args.len() < 2 {
            return Err(OpalDBError::WrongArgumentCount("SET".to_string()));
        }
        let mut cmd = Set {
            key: extract_bytes(&args[0])?,
            value: extract_bytes(&args[1])?,
            ..Default::default()
        };

        let mut parser = ArgParser::new(&args[2..]);
        let mut ttl_option_count = 0;

        loop {
            if let Some(seconds) = parser.match_u64_option("ex")? {
                cmd.ttl = TtlOption::Seconds(seconds);
                ttl_option_count += 1;
            } else if let Some(ms) = parser.match_u64_option("px")? {
                cmd.ttl = TtlOption::Milliseconds(ms);
                ttl_option_count += 1;
            } else {
                break;
            }
        }

        if ttl_option_count > 1 {
            return Err(OpalDBError::SyntaxError);
        }
        if !parser.remaining_args().is_empty() {
            return Err(OpalDBError::SyntaxError);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl ExecutableCommand for Set {
    /// Unconditional overwrite. Any expiry on a previous record is replaced
    /// by the new TTL option, or cleared when none is given.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<RespFrame, OpalDBError> {
        let expire_millis = match self.ttl {
            TtlOption::None => None,
            TtlOption::Seconds(s) => Some(s.saturating_mul(1000)),
            TtlOption::Milliseconds(ms) => Some(ms),
        };

        let now_ms = ctx.state.now_ms();
        ctx.state
            .kv
            .set(self.key.clone(), self.value.clone(), expire_millis, now_ms);

        Ok(RespFrame::SimpleString("OK".into()))
    }
}
