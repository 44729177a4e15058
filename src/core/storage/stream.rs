// src/core/storage/stream.rs

//! The append-only stream engine: entry ids, entries, per-key streams and
//! the engine that maps stream keys to streams.

use crate::core::OpalDBError;
use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

// --- Stream ID ---

/// A stream entry identifier: a millisecond timestamp paired with a sequence
/// number, totally ordered lexicographically (timestamp first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl FromStr for StreamId {
    type Err = OpalDBError;

    /// Accepts `<ms>` (sequence defaults to 0) and `<ms>-<seq>`. Both parts
    /// are non-negative base-10 integers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            None => {
                let ms = s.parse().map_err(|_| OpalDBError::InvalidStreamId)?;
                Ok(StreamId::new(ms, 0))
            }
            Some((ms, seq)) => {
                let ms = ms.parse().map_err(|_| OpalDBError::InvalidStreamId)?;
                let seq = seq.parse().map_err(|_| OpalDBError::InvalidStreamId)?;
                Ok(StreamId::new(ms, seq))
            }
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// How the client asked for the id of a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryIdSpec {
    /// `<ms>-<seq>`: take the id as given.
    Explicit(StreamId),
    /// `<ms>-*`: the server picks the sequence number.
    PartialMs(u64),
    /// `*`: the server picks both parts from its clock.
    Auto,
}

// --- Stream Entry ---

/// One immutable record in a stream. Field order is the order the client
/// supplied, hence the `IndexMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: IndexMap<Bytes, Bytes>,
    pub inserted_at: u64,
}

// --- Per-key stream ---

/// An ordered sequence of entries under one stream key. `last_id` is the id
/// of the top entry, or `0-0` for an empty stream; every successful append
/// produces an id strictly greater than it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    pub entries: BTreeMap<StreamId, StreamEntry>,
    pub last_id: StreamId,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, resolving the id spec against the current top item.
    ///
    /// Id generation:
    /// - `Explicit` ids are validated: `0-0` is never valid, and the id must
    ///   be strictly greater than `last_id`.
    /// - `PartialMs(ms)` picks `last_id.seq + 1` when `ms` matches the top
    ///   timestamp, otherwise 0. The exception is `ms == 0`, which starts at
    ///   1 so the result clears the forbidden `0-0`. (An empty stream has
    ///   `last_id == 0-0`, so `0-*` resolves to `0-1` through the same rule.)
    /// - `Auto` stamps the clock, clamped so a backwards step of the wall
    ///   clock cannot regress below the top timestamp.
    pub fn add_entry(
        &mut self,
        spec: EntryIdSpec,
        fields: IndexMap<Bytes, Bytes>,
        now_ms: u64,
    ) -> Result<StreamId, OpalDBError> {
        let new_id = match spec {
            EntryIdSpec::Explicit(id) => {
                if id == StreamId::MIN {
                    return Err(OpalDBError::StreamIdZero);
                }
                if id <= self.last_id {
                    return Err(OpalDBError::StreamIdTooSmall);
                }
                id
            }
            EntryIdSpec::PartialMs(ms) => {
                let seq = if ms == self.last_id.ms {
                    self.last_id.seq + 1
                } else if ms == 0 {
                    1
                } else {
                    0
                };
                let id = StreamId::new(ms, seq);
                if id <= self.last_id {
                    return Err(OpalDBError::StreamIdTooSmall);
                }
                id
            }
            EntryIdSpec::Auto => {
                let ms = now_ms.max(self.last_id.ms);
                let seq = if ms == self.last_id.ms {
                    self.last_id.seq + 1
                } else {
                    0
                };
                StreamId::new(ms, seq)
            }
        };

        let entry = StreamEntry {
            id: new_id,
            fields,
            inserted_at: now_ms,
        };
        self.entries.insert(new_id, entry);
        self.last_id = new_id;
        Ok(new_id)
    }
}

// --- Stream engine ---

/// The stream engine: stream key -> stream, behind one reader-writer lock.
/// The lock spans only the mutation or scan; waiter notification happens
/// after it is released.
#[derive(Debug, Default)]
pub struct StreamEngine {
    map: RwLock<HashMap<Bytes, Stream>>,
}

impl StreamEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the stream under `key`, creating it on first use.
    pub fn append(
        &self,
        key: &Bytes,
        spec: EntryIdSpec,
        fields: IndexMap<Bytes, Bytes>,
        now_ms: u64,
    ) -> Result<StreamId, OpalDBError> {
        let mut map = self.map.write();
        let stream = map.entry(key.clone()).or_default();
        stream.add_entry(spec, fields, now_ms)
    }

    /// Inclusive range scan in insertion order. A missing stream is an empty
    /// result, not an error.
    pub fn range(&self, key: &Bytes, start: StreamId, end: StreamId) -> Vec<StreamEntry> {
        let map = self.map.read();
        let Some(stream) = map.get(key) else {
            return Vec::new();
        };
        stream
            .entries
            .range((Bound::Included(start), Bound::Included(end)))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// All entries with an id strictly greater than `after`, in order.
    pub fn entries_after(&self, key: &Bytes, after: StreamId) -> Vec<StreamEntry> {
        let map = self.map.read();
        let Some(stream) = map.get(key) else {
            return Vec::new();
        };
        stream
            .entries
            .range((Bound::Excluded(after), Bound::Unbounded))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// The id of the top (most recently appended) entry, or `None` for a
    /// missing or empty stream.
    pub fn last_id(&self, key: &Bytes) -> Option<StreamId> {
        let map = self.map.read();
        map.get(key)
            .filter(|s| !s.entries.is_empty())
            .map(|s| s.last_id)
    }

    pub fn contains_key(&self, key: &Bytes) -> bool {
        self.map.read().contains_key(key)
    }
}
