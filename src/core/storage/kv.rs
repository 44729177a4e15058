// src/core/storage/kv.rs

//! The string key/value engine with optional millisecond expiry.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A single string record. `expire_at` is an absolute instant in clock
/// milliseconds; a record is live iff `expire_at` is absent or strictly in
/// the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    pub value: Bytes,
    pub inserted_at: u64,
    pub expire_at: Option<u64>,
}

impl KvRecord {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expire_at.is_some_and(|at| at <= now_ms)
    }
}

/// The key/value engine. One reader-writer lock guards the whole mapping;
/// the lock is never held across a suspension point.
#[derive(Debug, Default)]
pub struct KvEngine {
    map: RwLock<HashMap<Bytes, KvRecord>>,
}

impl KvEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite. A previous expiry does not survive the write;
    /// it is replaced by `expire_millis` (relative to `now_ms`) or cleared.
    pub fn set(&self, key: Bytes, value: Bytes, expire_millis: Option<u64>, now_ms: u64) {
        let record = KvRecord {
            value,
            inserted_at: now_ms,
            expire_at: expire_millis.map(|ms| now_ms.saturating_add(ms)),
        };
        self.map.write().insert(key, record);
    }

    /// Returns the live value for `key`. Expiry is lazy: an expired record is
    /// purged on encounter and reported as absent.
    pub fn get(&self, key: &Bytes, now_ms: u64) -> Option<Bytes> {
        {
            let map = self.map.read();
            match map.get(key) {
                Some(record) if !record.is_expired(now_ms) => return Some(record.value.clone()),
                Some(_) => {} // Expired; fall through to purge under the write lock.
                None => return None,
            }
        }

        let mut map = self.map.write();
        // Re-check: a writer may have replaced the record since the read guard
        // was released.
        if map.get(key).is_some_and(|r| r.is_expired(now_ms)) {
            map.remove(key);
        }
        None
    }

    /// True iff `key` holds a live record. Does not purge.
    pub fn contains_live(&self, key: &Bytes, now_ms: u64) -> bool {
        self.map
            .read()
            .get(key)
            .is_some_and(|r| !r.is_expired(now_ms))
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
