// src/core/storage/mod.rs

//! The storage engines. Each engine owns its own mapping and is guarded by a
//! single reader-writer lock; a key may exist in more than one engine at
//! once, and `TYPE` resolves the collision by probing KV, then streams, then
//! lists.

pub mod kv;
pub mod list;
pub mod stream;

pub use kv::{KvEngine, KvRecord};
pub use list::ListEngine;
pub use stream::{EntryIdSpec, Stream, StreamEngine, StreamEntry, StreamId};
