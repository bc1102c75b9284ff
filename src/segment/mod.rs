//! Segment (SSTable)
//!
//! Immutable, sorted, memory-mapped on-disk unit of persisted rows.
//!
//! ## File Format
//! All integers are 8-byte signed big-endian.
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Rows (ascending by key)                                 │
//! │   [KeyLen: i64][Key][Timestamp: i64][ValLen: i64][Val]  │
//! │   ... repeated for each row ...                         │
//! │   (ValLen = -1 means tombstone, no value bytes)         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Offset Index                                            │
//! │   [Offset: i64] per row, ascending                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer                                                  │
//! │   [RowCount: i64]                                       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Naming
//! A sealed segment is `<decimal-generation>.dat`. While writing, data goes
//! to `<decimal-generation>.tmp`, atomically renamed into the sealed name on
//! completion, so a half-written file is never visible under its final name.
//! The sealed file is marked read-only.

mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use reader::{Segment, SegmentIter};

/// Extension of sealed segment files
pub(crate) const DAT_EXT: &str = "dat";

/// Extension of in-progress segment files
pub(crate) const TMP_EXT: &str = "tmp";

/// Value-length sentinel marking a tombstone row
pub(crate) const TOMBSTONE_LEN: i64 = -1;

/// Fixed bytes per row besides key and payload: three i64 fields
pub(crate) const ROW_HEADER_LEN: usize = 24;

/// Path of the sealed segment for `generation`
pub(crate) fn sealed_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{generation}.{DAT_EXT}"))
}

/// Path of the in-progress file for `generation`
pub(crate) fn tmp_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{generation}.{TMP_EXT}"))
}

/// Parse a generation from a sealed segment filename.
///
/// Only an all-digits stem with the sealed extension qualifies; anything
/// else in the storage directory is ignored.
pub fn parse_generation(path: &Path) -> Option<u64> {
    if path.extension()? != DAT_EXT {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
