//! Segment writer
//!
//! Seals an ordered row stream into a new segment file.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::iter::Peekable;
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::Result;
use crate::row::Row;

use super::reader::Segment;
use super::{sealed_path, tmp_path, ROW_HEADER_LEN, TOMBSTONE_LEN};

impl Segment {
    /// Seal rows into the segment file for `generation`.
    ///
    /// `rows` must be ascending by key and free of duplicate keys. Rows are
    /// consumed while the accumulated key+payload bytes stay within
    /// `size_cap` (checked before each row); the remainder stays on the
    /// iterator for a subsequent call at a new generation. An exhausted
    /// iterator produces no file and returns `Ok(None)`.
    ///
    /// Data is written to the temporary name and atomically renamed into the
    /// sealed name once complete, which is the sole commit point. The sealed
    /// file is marked read-only and returned opened.
    pub fn flush<I>(
        rows: &mut Peekable<I>,
        dir: &Path,
        generation: u64,
        size_cap: u64,
    ) -> Result<Option<Segment>>
    where
        I: Iterator<Item = Row>,
    {
        if rows.peek().is_none() {
            return Ok(None);
        }

        let tmp = tmp_path(dir, generation);
        let sealed = sealed_path(dir, generation);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        let mut writer = BufWriter::new(file);

        let mut offsets: Vec<i64> = Vec::new();
        let mut offset: i64 = 0;
        let mut size: u64 = 0;

        while size <= size_cap {
            let Some(row) = rows.next() else { break };
            offsets.push(offset);

            writer.write_i64::<BigEndian>(row.key.len() as i64)?;
            writer.write_all(&row.key)?;
            writer.write_i64::<BigEndian>(row.value.timestamp())?;

            offset += (ROW_HEADER_LEN + row.key.len()) as i64;
            size += row.key.len() as u64;

            match row.value.payload() {
                Some(data) => {
                    writer.write_i64::<BigEndian>(data.len() as i64)?;
                    writer.write_all(data)?;
                    offset += data.len() as i64;
                    size += data.len() as u64;
                }
                None => writer.write_i64::<BigEndian>(TOMBSTONE_LEN)?,
            }
        }

        let row_count = offsets.len() as i64;
        for position in &offsets {
            writer.write_i64::<BigEndian>(*position)?;
        }
        writer.write_i64::<BigEndian>(row_count)?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &sealed)?;

        let mut perms = fs::metadata(&sealed)?.permissions();
        perms.set_readonly(true);
        fs::set_permissions(&sealed, perms)?;

        Segment::open(&sealed).map(Some)
    }
}
