//! Merge pipeline
//!
//! Pull-based stages composed by the engine for reads and compaction:
//! [`MergeIterator`] interleaves sorted row sources into one globally
//! ordered stream, and [`Collapse`] reduces each run of equal keys to its
//! first (newest) row. Tombstone filtering and projection are plain
//! iterator adapters on top.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use bytes::Bytes;

use crate::row::Row;

/// K-way merge of ascending row streams.
///
/// Sources must each be ascending by key with unique keys. Rows come out in
/// (key ascending, newest-value-first) order; rows that tie on both key and
/// timestamp resolve by source position, so callers pass newer sources
/// first (the memtable, then segments by descending generation).
pub struct MergeIterator<'a> {
    sources: Vec<Box<dyn Iterator<Item = Row> + 'a>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

struct HeapEntry {
    row: Row,
    source: usize,
}

impl Ord for HeapEntry {
    /// Key ascending, newest timestamp first, then source position.
    ///
    /// Deliberately not `Row`'s order: that one falls back to payload bytes
    /// on equal timestamps, which would let an older source's payload
    /// outrank a newer source on a timestamp tie.
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .key
            .cmp(&other.row.key)
            .then_with(|| {
                other
                    .row
                    .value
                    .timestamp()
                    .cmp(&self.row.value.timestamp())
            })
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl<'a> MergeIterator<'a> {
    pub fn new(mut sources: Vec<Box<dyn Iterator<Item = Row> + 'a>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(sources.len());
        for (source, rows) in sources.iter_mut().enumerate() {
            if let Some(row) = rows.next() {
                heap.push(Reverse(HeapEntry { row, source }));
            }
        }
        Self { sources, heap }
    }
}

impl Iterator for MergeIterator<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(entry) = self.heap.pop()?;
        if let Some(row) = self.sources[entry.source].next() {
            self.heap.push(Reverse(HeapEntry {
                row,
                source: entry.source,
            }));
        }
        Some(entry.row)
    }
}

/// Keeps the first row of each run of consecutive equal keys.
///
/// Fed from a [`MergeIterator`], the first row of a run is the newest
/// version of that key by construction of the merge order.
pub struct Collapse<I> {
    inner: I,
    last_key: Option<Bytes>,
}

impl<I> Collapse<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            last_key: None,
        }
    }
}

impl<I> Iterator for Collapse<I>
where
    I: Iterator<Item = Row>,
{
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.inner.next()?;
            if self.last_key.as_ref() == Some(&row.key) {
                continue;
            }
            self.last_key = Some(row.key.clone());
            return Some(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Value;

    fn row(key: &'static str, ts: i64, data: &'static str) -> Row {
        Row::new(
            Bytes::from_static(key.as_bytes()),
            Value::live(ts, Bytes::from_static(data.as_bytes())),
        )
    }

    fn source(rows: Vec<Row>) -> Box<dyn Iterator<Item = Row> + 'static> {
        Box::new(rows.into_iter())
    }

    #[test]
    fn merge_interleaves_by_key() {
        let merged = MergeIterator::new(vec![
            source(vec![row("a", 1, "1"), row("c", 1, "3")]),
            source(vec![row("b", 1, "2"), row("d", 1, "4")]),
        ]);
        let keys: Vec<Bytes> = merged.map(|r| r.key).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn merge_orders_duplicate_keys_newest_first() {
        let merged = MergeIterator::new(vec![
            source(vec![row("k", 100, "old")]),
            source(vec![row("k", 200, "new")]),
        ]);
        let rows: Vec<Row> = merged.collect();
        assert_eq!(rows[0].value.timestamp(), 200);
        assert_eq!(rows[1].value.timestamp(), 100);
    }

    #[test]
    fn merge_breaks_timestamp_ties_by_source_order() {
        // The winning payload sorts after the loser lexicographically, so
        // only source position can put it first.
        let merged = MergeIterator::new(vec![
            source(vec![row("k", 100, "zz-from-newer-source")]),
            source(vec![row("k", 100, "aa-from-older-source")]),
        ]);
        let rows: Vec<Row> = merged.collect();
        assert_eq!(
            rows[0].value.payload().unwrap().as_ref(),
            b"zz-from-newer-source"
        );
        assert_eq!(
            rows[1].value.payload().unwrap().as_ref(),
            b"aa-from-older-source"
        );
    }

    #[test]
    fn collapse_after_tied_merge_keeps_the_newer_source() {
        let merged = MergeIterator::new(vec![
            source(vec![row("k", 100, "zz-live")]),
            source(vec![row("k", 100, "aa-stale")]),
        ]);
        let resolved: Vec<Row> = Collapse::new(merged).collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value.payload().unwrap().as_ref(), b"zz-live");
    }

    #[test]
    fn collapse_keeps_first_of_each_run() {
        let rows = vec![
            row("a", 200, "new"),
            row("a", 100, "old"),
            row("b", 50, "only"),
            row("c", 300, "new"),
            row("c", 200, "older"),
            row("c", 100, "oldest"),
        ];
        let collapsed: Vec<Row> = Collapse::new(rows.into_iter()).collect();
        assert_eq!(collapsed.len(), 3);
        assert_eq!(collapsed[0].value.payload().unwrap().as_ref(), b"new");
        assert_eq!(collapsed[1].key, "b");
        assert_eq!(collapsed[2].value.timestamp(), 300);
    }

    #[test]
    fn merge_then_collapse_resolves_versions_across_sources() {
        let merged = MergeIterator::new(vec![
            source(vec![row("a", 300, "a-live"), row("b", 300, "b-live")]),
            source(vec![row("a", 100, "a-stale"), row("c", 100, "c-live")]),
        ]);
        let resolved: Vec<Row> = Collapse::new(merged).collect();
        let payloads: Vec<&[u8]> = resolved
            .iter()
            .map(|r| r.value.payload().unwrap().as_ref())
            .collect();
        assert_eq!(payloads, vec![&b"a-live"[..], b"b-live", b"c-live"]);
    }
}
