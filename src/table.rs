//! Table capability
//!
//! A [`Table`] is anything that can serve an ordered view of rows: the
//! mutable [`MemTable`](crate::memtable::MemTable) or an immutable on-disk
//! [`Segment`](crate::segment::Segment). Only the memtable overrides the
//! mutation methods; segments inherit the failing defaults, so sealed
//! storage can never be written through this surface.

use bytes::Bytes;

use crate::error::{Result, StrataError};
use crate::row::{Row, Value};

pub trait Table {
    /// Lazy ascending view of rows starting at the first key >= `from`.
    ///
    /// Each call produces fresh, forward-only iteration state.
    fn iter<'a>(&'a self, from: &'a [u8]) -> Box<dyn Iterator<Item = Row> + 'a>;

    /// Store a version for `key`. Fails on immutable tables.
    fn upsert(&mut self, _key: Bytes, _value: Value) -> Result<()> {
        Err(StrataError::ImmutableTable)
    }

    /// Store a tombstone for `key` at `timestamp`. Fails on immutable tables.
    fn remove(&mut self, _key: Bytes, _timestamp: i64) -> Result<()> {
        Err(StrataError::ImmutableTable)
    }
}
