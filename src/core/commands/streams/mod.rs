// src/core/commands/streams/mod.rs

pub mod xadd;
pub mod xrange;
pub mod xread;

pub use xadd::XAdd;
pub use xrange::XRange;
pub use xread::XRead;

use crate::core::RespFrame;
use crate::core::storage::StreamEntry;

/// Formats a single stream entry into the `[id, [field, value, ...]]` array
/// shape shared by `XRANGE` and `XREAD` replies.
pub fn format_entry(entry: &StreamEntry) -> RespFrame {
    let mut fields_array = Vec::with_capacity(entry.fields.len() * 2);
    for (k, v) in &entry.fields {
        fields_array.push(RespFrame::BulkString(k.clone()));
        fields_array.push(RespFrame::BulkString(v.clone()));
    }
    RespFrame::Array(vec![
        RespFrame::BulkString(entry.id.to_string().into()),
        RespFrame::Array(fields_array),
    ])
}
