//! Entry payload records.
//!
//! # Record Structure
//! ```text
//! [1 byte ] Line count
//! [1 byte ] Flags (opaque, preserved)
//! per line:
//!   [4 bytes] Start frame      (little-endian u32)
//!   [4 bytes] End frame        (little-endian u32)
//!   [2 bytes] Text byte length (little-endian u16)
//!   [N bytes] Text in the container's encoding, no terminator
//! ```
//!
//! The hash is not part of the record; it lives in the index table.

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::Encoding;
use log::trace;

use crate::subp::codec::text;
use crate::subp::types::error::{Result, SubpError};
use crate::subp::types::models::{Entry, Line};
use crate::subp::utils;

/// Decodes the record at `offset`.
///
/// The returned entry carries `hash` but no identifier; dictionary resolution
/// is left to the caller. Never reads past the end of `data`.
pub fn parse(data: &[u8], offset: usize, encoding: &'static Encoding, hash: u32) -> Result<Entry> {
    let start = offset.min(data.len());
    let mut reader = &data[start..];
    let position = |reader: &[u8]| (data.len() - reader.len()) as u64;
    let truncated = |reader: &[u8]| SubpError::Truncated {
        context: "entry payload",
        offset: position(reader),
    };

    let line_count = reader.read_u8().map_err(|_| truncated(reader))?;
    let flags = reader.read_u8().map_err(|_| truncated(reader))?;

    let mut lines = Vec::with_capacity(line_count as usize);
    for _ in 0..line_count {
        let line_start = reader.read_u32::<LittleEndian>().map_err(|_| truncated(reader))?;
        let line_end = reader.read_u32::<LittleEndian>().map_err(|_| truncated(reader))?;
        let text_len = reader.read_u16::<LittleEndian>().map_err(|_| truncated(reader))? as usize;
        if reader.len() < text_len {
            return Err(truncated(reader));
        }
        let (text_bytes, rest) = reader.split_at(text_len);
        let text = text::decode_strict(text_bytes, encoding, hash)?.into_owned();
        reader = rest;
        lines.push(Line {
            start: line_start,
            end: line_end,
            text,
        });
    }

    trace!(
        "Entry {:#010x} at {:#x}: {} lines, {} bytes",
        hash,
        offset,
        lines.len(),
        position(reader) - offset as u64
    );

    Ok(Entry {
        hash,
        id: None,
        flags,
        lines,
    })
}

/// Encodes `entry` and returns the number of bytes written.
pub fn write<W: Write>(writer: &mut W, entry: &Entry, encoding: &'static Encoding) -> Result<usize> {
    let line_count: u8 = utils::narrow(entry.lines.len() as u64, "line count")?;
    writer.write_u8(line_count)?;
    writer.write_u8(entry.flags)?;
    let mut written = 2;

    for line in &entry.lines {
        let bytes = text::encode_strict(&line.text, encoding, entry.hash)?;
        let text_len: u16 = utils::narrow(bytes.len() as u64, "line text length")?;
        writer.write_u32::<LittleEndian>(line.start)?;
        writer.write_u32::<LittleEndian>(line.end)?;
        writer.write_u16::<LittleEndian>(text_len)?;
        writer.write_all(&bytes)?;
        written += 10 + bytes.len();
    }

    Ok(written)
}
