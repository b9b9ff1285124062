//! Index table: one `(hash, offset)` pair per entry, stored right after the
//! header.
//!
//! ```text
//! [4 bytes] Hash   (little-endian u32)
//! [4 bytes] Offset (little-endian u32, absolute from the container start)
//! ```

use std::io::Write;
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use crate::subp::types::error::{Result, SubpError};
use crate::subp::types::models::IndexRecord;

/// Size of one index record in bytes.
pub const RECORD_SIZE: usize = 8;

/// Bytes occupied by an index table of `count` records.
pub fn table_len(count: usize) -> usize {
    count * RECORD_SIZE
}

/// Reads `count` records starting at `table_start`.
///
/// Fails with [`SubpError::CountMismatch`] if the stream is too short to hold
/// the whole table.
pub fn parse(data: &[u8], table_start: usize, count: u16) -> Result<Vec<IndexRecord>> {
    let required = table_len(count as usize);
    let available = data.len().saturating_sub(table_start);
    if required > available {
        return Err(SubpError::CountMismatch {
            count,
            required: required as u64,
            available: available as u64,
        });
    }

    let mut reader = &data[table_start..table_start + required];
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let hash = reader.read_u32::<LittleEndian>()?;
        let offset = reader.read_u32::<LittleEndian>()?;
        trace!("Index record: hash={:#010x}, offset={:#x}", hash, offset);
        records.push(IndexRecord { hash, offset });
    }
    Ok(records)
}

/// Checks that a record points into `payload`, the region after the table.
pub fn check_bounds(record: &IndexRecord, payload: &Range<u64>) -> Result<()> {
    if payload.contains(&(record.offset as u64)) {
        Ok(())
    } else {
        Err(SubpError::OffsetOutOfBounds {
            hash: record.hash,
            offset: record.offset,
            start: payload.start,
            end: payload.end,
        })
    }
}

/// Writes records in the given order.
pub fn write<W: Write>(writer: &mut W, records: &[IndexRecord]) -> Result<()> {
    for record in records {
        writer.write_u32::<LittleEndian>(record.hash)?;
        writer.write_u32::<LittleEndian>(record.offset)?;
    }
    Ok(())
}
