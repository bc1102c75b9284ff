//! Engine
//!
//! The orchestrator: owns the active memtable and the set of sealed
//! segments, flushes on threshold, serves merged reads, and rewrites the
//! segment set on explicit compaction.
//!
//! ## Concurrency Model
//!
//! Single-threaded and synchronous by design: no internal locking, no
//! background work. A flush runs inline with the write that crosses the
//! threshold, so that caller observes the flush latency. Concurrent use
//! must be serialized externally. A `scan` borrows the engine for the
//! iterator's lifetime, so a flush or compaction can never invalidate an
//! in-flight read.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::iterator::{Collapse, MergeIterator};
use crate::memtable::MemTable;
use crate::row::{Row, Value};
use crate::segment::{parse_generation, Segment};
use crate::table::Table;

/// The storage engine.
///
/// Writes land in the memtable; once its byte estimate exceeds the flush
/// threshold the table is sealed into a segment at the next generation.
/// Reads merge the memtable with every segment, newest version first.
pub struct Engine {
    config: Config,

    /// Sealed segments by generation; merged newest-generation-first.
    segments: BTreeMap<u64, Segment>,

    /// Active table of pending writes.
    memtable: MemTable,

    /// Generation assigned to the next sealed segment.
    next_generation: u64,

    /// Version stamps for writes; strictly monotonic per instance.
    clock: VersionClock,
}

impl Engine {
    /// Open or create an engine over the configured directory.
    ///
    /// Scans the directory non-recursively; every file named
    /// `<decimal-generation>.dat` is opened as a segment (a malformed one
    /// fails the open), everything else is ignored. The next generation is
    /// one past the highest discovered, or 0 for an empty directory.
    pub fn open(config: Config) -> Result<Self> {
        let inaccessible = |e: std::io::Error| {
            StrataError::Init(format!(
                "cannot access storage at {}: {e}",
                config.data_dir.display()
            ))
        };

        fs::create_dir_all(&config.data_dir).map_err(inaccessible)?;

        let mut segments = BTreeMap::new();
        let mut max_generation = None;

        for entry in fs::read_dir(&config.data_dir).map_err(inaccessible)? {
            let path = entry.map_err(inaccessible)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(generation) = parse_generation(&path) else {
                continue;
            };
            segments.insert(generation, Segment::open(&path)?);
            max_generation = Some(max_generation.map_or(generation, |max: u64| max.max(generation)));
        }

        let next_generation = max_generation.map_or(0, |max| max + 1);
        info!(
            segments = segments.len(),
            next_generation,
            dir = %config.data_dir.display(),
            "opened storage engine"
        );

        Ok(Self {
            config,
            segments,
            memtable: MemTable::new(),
            next_generation,
            clock: VersionClock::new(),
        })
    }

    /// Open with a directory and flush threshold (convenience method)
    pub fn open_path(path: &Path, flush_threshold: u64) -> Result<Self> {
        Self::open(
            Config::builder()
                .data_dir(path)
                .flush_threshold(flush_threshold)
                .build(),
        )
    }

    /// Ordered stream of live (key, payload) pairs starting at the first
    /// key >= `from`.
    ///
    /// Lazy, one-shot, forward-only: one ascending source per table is
    /// merged by (key, recency), collapsed to the newest version per key,
    /// tombstones dropped, and the survivors projected to their payloads.
    pub fn scan<'a>(&'a self, from: &'a [u8]) -> impl Iterator<Item = (Bytes, Bytes)> + 'a {
        let mut sources: Vec<Box<dyn Iterator<Item = Row> + 'a>> =
            Vec::with_capacity(self.segments.len() + 1);
        sources.push(self.memtable.iter(from));
        for segment in self.segments.values().rev() {
            sources.push(segment.iter(from));
        }

        Collapse::new(MergeIterator::new(sources)).filter_map(|row| {
            let key = row.key;
            row.value.into_payload().map(|data| (key, data))
        })
    }

    /// Get the live value for a key, or `None` if absent or deleted.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.scan(key)
            .next()
            .and_then(|(found, data)| (found == key).then_some(data))
    }

    /// Put a key-value pair; flushes inline if the memtable crossed the
    /// threshold.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let timestamp = self.clock.tick();
        self.memtable.upsert(
            Bytes::copy_from_slice(key),
            Value::live(timestamp, Bytes::copy_from_slice(value)),
        )?;
        self.maybe_flush()
    }

    /// Delete a key by writing a tombstone; flushes inline if the memtable
    /// crossed the threshold.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let timestamp = self.clock.tick();
        self.memtable
            .remove(Bytes::copy_from_slice(key), timestamp)?;
        self.maybe_flush()
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.memtable.size() > self.config.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Seal the memtable's contents into segments, regardless of size.
    ///
    /// The sorted contents are written through the bounded segment writer;
    /// if they exceed the size cap the remainder continues at the next
    /// generation, so nothing is left behind. The memtable is replaced with
    /// an empty one only after every row is durable.
    pub fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        let mut rows = self.memtable.iter(b"").peekable();
        while let Some(segment) = Segment::flush(
            &mut rows,
            &self.config.data_dir,
            self.next_generation,
            self.config.flush_threshold,
        )? {
            debug!(
                generation = segment.generation(),
                rows = segment.row_count(),
                "sealed memtable into segment"
            );
            self.segments.insert(segment.generation(), segment);
            self.next_generation += 1;
        }
        drop(rows);

        self.memtable = MemTable::new();
        Ok(())
    }

    /// Merge every segment into a fresh, deduplicated segment set.
    ///
    /// The memtable is excluded. Superseded versions are dropped by the
    /// collapse stage; tombstones are retained (reads keep filtering them).
    /// Replacements are renumbered from generation 0 with the usual size
    /// cap, the live set is swapped wholesale, and old files that were not
    /// reused by rename are deleted once their mappings are released.
    /// Explicit invocation only; nothing schedules this automatically.
    pub fn compact(&mut self) -> Result<()> {
        let old_paths: Vec<PathBuf> = self
            .segments
            .values()
            .map(|segment| segment.path().to_path_buf())
            .collect();

        let mut replacements = BTreeMap::new();
        {
            let mut sources: Vec<Box<dyn Iterator<Item = Row> + '_>> =
                Vec::with_capacity(self.segments.len());
            for segment in self.segments.values().rev() {
                sources.push(segment.iter(b""));
            }
            let mut rows = Collapse::new(MergeIterator::new(sources)).peekable();

            let mut generation = 0;
            while let Some(segment) = Segment::flush(
                &mut rows,
                &self.config.data_dir,
                generation,
                self.config.flush_threshold,
            )? {
                generation += 1;
                replacements.insert(segment.generation(), segment);
            }
        }

        let kept: HashSet<PathBuf> = replacements
            .values()
            .map(|segment| segment.path().to_path_buf())
            .collect();

        // Drop the old set first so its mappings are released before the
        // files disappear. Paths reused by rename now belong to the new set.
        self.segments = replacements;
        for path in old_paths {
            if !kept.contains(&path) {
                fs::remove_file(&path)?;
            }
        }

        info!(segments = self.segments.len(), "compaction complete");
        Ok(())
    }

    /// Close the engine, flushing any pending writes.
    ///
    /// A no-op for an empty memtable. Durability of every acknowledged
    /// write is guaranteed once this returns.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the current memtable byte estimate
    pub fn memtable_size(&self) -> u64 {
        self.memtable.size()
    }

    /// Get the number of keys buffered in the memtable
    pub fn memtable_len(&self) -> usize {
        self.memtable.len()
    }

    /// Get the number of sealed segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Write timestamps: wall-clock milliseconds forced strictly monotonic.
///
/// Same-millisecond writes get distinct, ordered stamps, and stamps stay
/// above anything persisted by earlier runs of the same store.
#[derive(Debug)]
struct VersionClock {
    last: i64,
}

impl VersionClock {
    fn new() -> Self {
        Self { last: 0 }
    }

    fn tick(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as i64);
        self.last = now.max(self.last + 1);
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::VersionClock;

    #[test]
    fn clock_is_strictly_monotonic() {
        let mut clock = VersionClock::new();
        let mut last = clock.tick();
        for _ in 0..1000 {
            let next = clock.tick();
            assert!(next > last);
            last = next;
        }
    }
}
