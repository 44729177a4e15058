// src/core/protocol/mod.rs

//! The wire protocol layer: frame types and the framed codec.
//!
//! `RespFrame` serves double duty. The codec decodes requests into frames and
//! encodes reply frames back out, and the command layer builds its replies as
//! frames directly; with five reply shapes there is nothing a separate
//! command-facing value type would add.

mod resp_frame;

pub use resp_frame::{RespFrame, RespFrameCodec};
