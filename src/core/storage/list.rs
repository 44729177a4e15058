// src/core/storage/list.rs

//! The list engine: ordered string lists with tail insertion.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The list engine. Only tail appends are supported; elements are kept in
/// insertion order.
#[derive(Debug, Default)]
pub struct ListEngine {
    map: RwLock<HashMap<Bytes, Vec<Bytes>>>,
}

impl ListEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `values` to the tail of the list under `key`, creating the
    /// list on first push, and returns the new length.
    pub fn rpush(&self, key: &Bytes, values: Vec<Bytes>) -> usize {
        let mut map = self.map.write();
        let list = map.entry(key.clone()).or_default();
        list.extend(values);
        list.len()
    }

    pub fn contains_key(&self, key: &Bytes) -> bool {
        self.map.read().contains_key(key)
    }

    /// A snapshot of the list under `key`, if present.
    pub fn get(&self, key: &Bytes) -> Option<Vec<Bytes>> {
        self.map.read().get(key).cloned()
    }
}
