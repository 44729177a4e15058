// src/core/commands/helpers.rs

//! Provides helper functions for parsing command arguments from `RespFrame`s.
//! These helpers reduce boilerplate and ensure consistent error handling across commands.

use crate::core::OpalDBError;
use crate::core::protocol::RespFrame;
use bytes::Bytes;

/// A helper struct to parse command arguments sequentially.
/// This simplifies parsing optional flags and option/value pairs.
pub struct ArgParser<'a> {
    args: &'a [RespFrame],
    cursor: usize,
}

impl<'a> ArgParser<'a> {
    /// Creates a new parser over a slice of arguments.
    pub fn new(args: &'a [RespFrame]) -> Self {
        Self { args, cursor: 0 }
    }

    /// Checks if the next argument matches a specific flag (case-insensitively).
    /// If it matches, consumes the argument and returns true.
    pub fn match_flag(&mut self, flag_name: &str) -> bool {
        if let Some(arg_str) = self.peek_str()
            && arg_str.eq_ignore_ascii_case(flag_name)
        {
            self.cursor += 1;
            return true;
        }
        false
    }

    /// Checks if the next argument matches an option name. If it matches,
    /// consumes both the option name and its value and parses the value as a
    /// non-negative integer.
    pub fn match_u64_option(&mut self, opt_name: &str) -> Result<Option<u64>, OpalDBError> {
        if let Some(arg_str) = self.peek_str() {
            if arg_str.eq_ignore_ascii_case(opt_name) {
                if self.cursor + 1 >= self.args.len() {
                    return Err(OpalDBError::SyntaxError);
                }
                let value_str = extract_string(&self.args[self.cursor + 1])?;
                let parsed = value_str
                    .parse::<u64>()
                    .map_err(|_| OpalDBError::NotAnInteger)?;

                self.cursor += 2; // Consume both the option name and its value
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    /// Returns the remaining arguments that have not been consumed.
    pub fn remaining_args(&self) -> &'a [RespFrame] {
        &self.args[self.cursor..]
    }

    /// Peeks at the next argument as a string without consuming it.
    fn peek_str(&self) -> Option<String> {
        self.args
            .get(self.cursor)
            .and_then(|frame| extract_string(frame).ok())
    }
}

/// Extracts a `String` from a `RespFrame::BulkString`.
/// Returns a `WrongType` error if the frame is not a BulkString or not valid UTF-8.
pub fn extract_string(frame: &RespFrame) -> Result<String, OpalDBError> {
    if let RespFrame::BulkString(bs) = frame {
        String::from_utf8(bs.to_vec()).map_err(|_| OpalDBError::WrongType)
    } else {
        Err(OpalDBError::WrongType)
    }
}

/// Extracts `Bytes` from a `RespFrame::BulkString`.
/// Returns a `WrongType` error if the frame is not a BulkString.
pub fn extract_bytes(frame: &RespFrame) -> Result<Bytes, OpalDBError> {
    match frame {
        RespFrame::BulkString(bs) => Ok(bs.clone()),
        _ => Err(OpalDBError::WrongType),
    }
}

/// Validates that the number of arguments matches an exact expected count.
pub fn validate_arg_count(
    args: &[RespFrame],
    expected: usize,
    cmd: &str,
) -> Result<(), OpalDBError> {
    if args.len() != expected {
        Err(OpalDBError::WrongArgumentCount(cmd.to_string()))
    } else {
        Ok(())
    }
}

/// Parses arguments for commands that follow the pattern `COMMAND key value1 [value2 ...]`.
pub fn parse_key_and_values(
    args: &[RespFrame],
    min_args: usize,
    cmd: &str,
) -> Result<(Bytes, Vec<Bytes>), OpalDBError> {
    if args.len() < min_args {
        return Err(OpalDBError::WrongArgumentCount(cmd.to_string()));
    }
    let key = extract_bytes(&args[0])?;
    let values = args[1..]
        .iter()
        .map(extract_bytes)
        .collect::<Result<_, _>>()?;
    Ok((key, values))
}
