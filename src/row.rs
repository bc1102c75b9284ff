//! Versioned value model
//!
//! A [`Value`] is a single timestamped write; an absent payload marks a
//! tombstone. A [`Row`] pairs a key with a value and carries the two-level
//! ordering used as the k-way merge key: key ascending, then newest value
//! first.

use std::cmp::Ordering;

use bytes::Bytes;

/// A single versioned write: a timestamp plus an optional payload.
///
/// `payload == None` means the key was deleted at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    timestamp: i64,
    payload: Option<Bytes>,
}

impl Value {
    /// A live value written at `timestamp`.
    pub fn live(timestamp: i64, payload: Bytes) -> Self {
        Self {
            timestamp,
            payload: Some(payload),
        }
    }

    /// A deletion marker written at `timestamp`.
    pub fn tombstone(timestamp: i64) -> Self {
        Self {
            timestamp,
            payload: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.payload.is_none()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The payload, or `None` for a tombstone.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Consume the value, yielding its payload.
    pub fn into_payload(self) -> Option<Bytes> {
        self.payload
    }
}

impl Ord for Value {
    /// Newer timestamps sort first; payload bytes break exact ties so the
    /// order stays consistent with `Eq`. Only ever used to pick the winning
    /// version among duplicate keys during a merge.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key paired with one version of its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Bytes,
    pub value: Value,
}

impl Row {
    pub fn new(key: Bytes, value: Value) -> Self {
        Self { key, value }
    }
}

impl Ord for Row {
    /// Key ascending (unsigned lexicographic), then value recency.
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Row {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
