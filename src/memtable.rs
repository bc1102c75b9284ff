//! MemTable
//!
//! Sorted in-memory buffer of pending writes.
//!
//! ## Responsibilities
//! - Hold the newest version of each recently written key
//! - Track an approximate byte footprint for the flush trigger
//! - Serve ordered iteration from an arbitrary key (for reads and flush)
//!
//! ## Data Structure Choice
//! BTreeMap: keys are already needed in sorted order for segment writing,
//! and `range` gives the lower-bound view for free.

use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;

use crate::error::Result;
use crate::row::{Row, Value};
use crate::table::Table;

/// Mutable in-memory table of recent writes with byte-size accounting.
///
/// The size estimate counts key and payload bytes only. It mirrors the
/// flush-trigger arithmetic of the on-disk size cap, not true memory usage.
#[derive(Debug, Default)]
pub struct MemTable {
    map: BTreeMap<Bytes, Value>,
    size: u64,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte estimate, checked after every mutation to decide flush.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of distinct keys (tombstones included).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Table for MemTable {
    fn iter<'a>(&'a self, from: &'a [u8]) -> Box<dyn Iterator<Item = Row> + 'a> {
        let range = self
            .map
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded));
        Box::new(range.map(|(key, value)| Row::new(key.clone(), value.clone())))
    }

    fn upsert(&mut self, key: Bytes, value: Value) -> Result<()> {
        match self.map.get(&key) {
            Some(old) => {
                if let Some(data) = old.payload() {
                    self.size -= data.len() as u64;
                }
            }
            None => self.size += key.len() as u64,
        }
        if let Some(data) = value.payload() {
            self.size += data.len() as u64;
        }

        self.map.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: Bytes, timestamp: i64) -> Result<()> {
        match self.map.get(&key).and_then(Value::payload) {
            Some(data) => self.size -= data.len() as u64,
            // Also taken when the key already holds a tombstone; the
            // estimate then counts the key twice, matching the reference
            // bookkeeping.
            None => self.size += key.len() as u64,
        }

        self.map.insert(key, Value::tombstone(timestamp));
        Ok(())
    }
}
