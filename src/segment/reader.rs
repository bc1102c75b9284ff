//! Segment reader
//!
//! Memory-maps a sealed segment and serves binary-search lookups through
//! its offset index. Footer and index consistency are validated once at
//! open, so row decoding afterwards is plain slicing.

use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use memmap2::Mmap;

use crate::error::{Result, StrataError};
use crate::row::{Row, Value};
use crate::table::Table;

use super::{parse_generation, ROW_HEADER_LEN, TOMBSTONE_LEN};

/// An immutable on-disk table of sorted rows.
///
/// The mapping is owned exclusively by this instance and released when it
/// is dropped.
pub struct Segment {
    path: PathBuf,
    mmap: Mmap,
    generation: u64,
    row_count: usize,
    index_start: usize,
}

impl Segment {
    /// Open and validate a sealed segment.
    ///
    /// The row count is read from the last 8 bytes; the offset index starts
    /// at `len - 8 * (rowCount + 1)`. Every index entry is checked to point
    /// at a record that lies within the data area and ends exactly where
    /// the next one starts, so a truncated or inconsistent file is rejected
    /// here instead of slicing out of bounds later.
    pub fn open(path: &Path) -> Result<Self> {
        let generation = parse_generation(path).ok_or_else(|| {
            StrataError::Init(format!("not a segment file: {}", path.display()))
        })?;

        let file = File::open(path)?;
        if file.metadata()?.len() < 8 {
            return Err(corrupt(path, "missing row count footer"));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        let len = mmap.len();

        let row_count = BigEndian::read_i64(&mmap[len - 8..]);
        let row_count = usize::try_from(row_count)
            .map_err(|_| corrupt(path, "negative row count"))?;

        let index_len = row_count
            .checked_add(1)
            .and_then(|entries| entries.checked_mul(8))
            .ok_or_else(|| corrupt(path, "row count overflow"))?;
        let index_start = len
            .checked_sub(index_len)
            .ok_or_else(|| corrupt(path, "offset index exceeds file length"))?;

        let mut expected = 0usize;
        for entry in 0..row_count {
            let pos = index_start + entry * 8;
            let offset = BigEndian::read_i64(&mmap[pos..pos + 8]);
            if offset < 0 || offset as usize != expected {
                return Err(corrupt(path, "offset index out of sequence"));
            }

            if expected + ROW_HEADER_LEN > index_start {
                return Err(corrupt(path, "row header extends past offset index"));
            }
            let key_len = BigEndian::read_i64(&mmap[expected..expected + 8]);
            let key_len = usize::try_from(key_len)
                .map_err(|_| corrupt(path, "negative key length"))?;
            let header_end = expected
                .checked_add(ROW_HEADER_LEN + key_len)
                .ok_or_else(|| corrupt(path, "key length overflow"))?;
            if header_end > index_start {
                return Err(corrupt(path, "key extends past offset index"));
            }

            let value_len =
                BigEndian::read_i64(&mmap[header_end - 8..header_end]);
            let end = if value_len == TOMBSTONE_LEN {
                header_end
            } else {
                let value_len = usize::try_from(value_len)
                    .map_err(|_| corrupt(path, "negative value length"))?;
                header_end
                    .checked_add(value_len)
                    .ok_or_else(|| corrupt(path, "value length overflow"))?
            };
            if end > index_start {
                return Err(corrupt(path, "value extends past offset index"));
            }
            expected = end;
        }
        if expected != index_start {
            return Err(corrupt(path, "rows do not end at the offset index"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            generation,
            row_count,
            index_start,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Smallest row index whose key is >= `from`, or `row_count` if none.
    ///
    /// Binary search over the offset index; only the probed key is decoded.
    pub fn lower_bound(&self, from: &[u8]) -> usize {
        let mut low = 0;
        let mut high = self.row_count;
        while low < high {
            let mid = low + (high - low) / 2;
            if self.key_at(mid) < from {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    fn offset(&self, index: usize) -> usize {
        let pos = self.index_start + index * 8;
        BigEndian::read_i64(&self.mmap[pos..pos + 8]) as usize
    }

    fn key_at(&self, index: usize) -> &[u8] {
        let offset = self.offset(index);
        let key_len = BigEndian::read_i64(&self.mmap[offset..offset + 8]) as usize;
        &self.mmap[offset + 8..offset + 8 + key_len]
    }

    fn row_at(&self, index: usize) -> Row {
        let offset = self.offset(index);
        let key_len = BigEndian::read_i64(&self.mmap[offset..offset + 8]) as usize;
        let key_end = offset + 8 + key_len;
        let key = Bytes::copy_from_slice(&self.mmap[offset + 8..key_end]);

        let timestamp = BigEndian::read_i64(&self.mmap[key_end..key_end + 8]);
        let value_len = BigEndian::read_i64(&self.mmap[key_end + 8..key_end + 16]);

        let value = if value_len == TOMBSTONE_LEN {
            Value::tombstone(timestamp)
        } else {
            let start = key_end + 16;
            let data = Bytes::copy_from_slice(&self.mmap[start..start + value_len as usize]);
            Value::live(timestamp, data)
        };

        Row::new(key, value)
    }
}

impl Table for Segment {
    fn iter<'a>(&'a self, from: &'a [u8]) -> Box<dyn Iterator<Item = Row> + 'a> {
        Box::new(SegmentIter {
            segment: self,
            position: self.lower_bound(from),
        })
    }
}

/// Forward cursor over a segment's rows.
pub struct SegmentIter<'a> {
    segment: &'a Segment,
    position: usize,
}

impl Iterator for SegmentIter<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.segment.row_count {
            return None;
        }
        let row = self.segment.row_at(self.position);
        self.position += 1;
        Some(row)
    }
}

fn corrupt(path: &Path, reason: &str) -> StrataError {
    StrataError::Init(format!("corrupt segment {}: {reason}", path.display()))
}
