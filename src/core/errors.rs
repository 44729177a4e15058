// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
///
/// The `Display` implementation of every client-visible variant is the exact
/// text written into the SimpleError reply frame, so the command layer can
/// map any error to the wire with `e.to_string()`.
#[derive(Error, Debug)]
pub enum OpalDBError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// The decode buffer holds only a prefix of a frame. Never sent to a
    /// client; the codec translates it into "wait for more bytes".
    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("ERR Protocol error: unexpected end of stream")]
    TruncatedFrame,

    #[error("ERR Protocol error: invalid integer")]
    MalformedInteger,

    #[error("ERR Protocol error: bulk length mismatch")]
    LengthMismatch,

    #[error("ERR Protocol error: {0}")]
    ProtocolError(String),

    #[error("ERR unknown command")]
    UnknownCommand(String),

    #[error("ERR syntax error")]
    SyntaxError,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgumentCount(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR Invalid stream ID specified as stream command argument")]
    InvalidStreamId,

    #[error("ERR The ID specified in XADD must be greater than 0-0")]
    StreamIdZero,

    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    StreamIdTooSmall,

    #[error("ERR internal")]
    Internal(String),
}

impl OpalDBError {
    /// Whether the connection can survive this error. Protocol-level failures
    /// leave the byte stream in an unknown state and force a close; command
    /// and stream errors are reported and the connection keeps reading.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OpalDBError::Io(_)
                | OpalDBError::IncompleteData
                | OpalDBError::TruncatedFrame
                | OpalDBError::MalformedInteger
                | OpalDBError::LengthMismatch
                | OpalDBError::ProtocolError(_)
        )
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for OpalDBError {
    fn from(e: std::io::Error) -> Self {
        OpalDBError::Io(Arc::new(e))
    }
}

impl From<ParseIntError> for OpalDBError {
    fn from(_: ParseIntError) -> Self {
        OpalDBError::NotAnInteger
    }
}

impl From<std::str::Utf8Error> for OpalDBError {
    fn from(_: std::str::Utf8Error) -> Self {
        OpalDBError::WrongType
    }
}

impl From<std::string::FromUtf8Error> for OpalDBError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        OpalDBError::WrongType
    }
}
