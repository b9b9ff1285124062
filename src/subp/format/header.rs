//! Container header parsing and writing.
//!
//! # Header Structure
//! ```text
//! [1 byte ] Format tag (0x13)
//! [1 byte ] Control: bits 0-3 sub-version, bits 4-5 reserved, bits 6-7 sort class
//! [1 byte ] Language id        (sub-version >= 2 only)
//! [1 byte ] Voice id           (sub-version >= 2 only)
//! [2 bytes] Entry count (little-endian u16)
//! ```
//!
//! Historical files start with the 16-bit magic `0x0113`, which is the tag
//! followed by a control byte of sub-version 1 and sort class 0.

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use crate::subp::types::error::{Result, SubpError};
use crate::subp::types::models::{ContainerHeader, SortOrder};

/// Discriminator byte at offset 0.
pub const FORMAT_TAG: u8 = 0x13;

/// Header size of sub-version 1 files.
pub const LEGACY_LEN: usize = 4;

/// Header size of sub-version 2+ files.
pub const EXTENDED_LEN: usize = 6;

const VERSION_MASK: u8 = 0x0F;
const RESERVED_SHIFT: u8 = 4;
const SORT_SHIFT: u8 = 6;

/// Size of the encoded header, including the entry count.
pub fn encoded_len(header: &ContainerHeader) -> usize {
    if header.is_extended() {
        EXTENDED_LEN
    } else {
        LEGACY_LEN
    }
}

/// Packs sub-version, reserved bits and sort class into the control byte.
pub fn pack_control(header: &ContainerHeader) -> u8 {
    (header.version & VERSION_MASK)
        | ((header.reserved & 0b11) << RESERVED_SHIFT)
        | (header.sort.bits() << SORT_SHIFT)
}

/// Splits a control byte into `(version, reserved, sort)`.
pub fn unpack_control(control: u8) -> (u8, u8, SortOrder) {
    (
        control & VERSION_MASK,
        (control >> RESERVED_SHIFT) & 0b11,
        SortOrder::from_bits(control >> SORT_SHIFT),
    )
}

/// Parses the header from the start of `data`.
///
/// Returns the header and the declared entry count. The caller checks the
/// count against the stream length.
pub fn parse(data: &[u8]) -> Result<(ContainerHeader, u16)> {
    let mut reader = data;
    let truncated = |offset: usize| SubpError::Truncated {
        context: "header",
        offset: offset as u64,
    };

    let tag = reader.read_u8().map_err(|_| truncated(0))?;
    if tag != FORMAT_TAG {
        return Err(SubpError::InvalidMagic {
            expected: FORMAT_TAG,
            found: tag,
        });
    }

    let control = reader.read_u8().map_err(|_| truncated(1))?;
    let (version, reserved, sort) = unpack_control(control);
    if version == 0 {
        return Err(SubpError::UnsupportedVersion(version));
    }
    trace!("Header control byte {:#04x}: version={}, sort={}, reserved={}", control, version, sort, reserved);

    let mut header = ContainerHeader {
        version,
        sort,
        reserved,
        language: None,
        voice: 0,
    };

    if header.is_extended() {
        header.language = Some(reader.read_u8().map_err(|_| truncated(2))?);
        header.voice = reader.read_u8().map_err(|_| truncated(3))?;
    }

    let count_offset = encoded_len(&header) - 2;
    let count = reader
        .read_u16::<LittleEndian>()
        .map_err(|_| truncated(count_offset))?;

    debug!(
        "Parsed header: version={}, sort={}, language={:?}, voice={}, entries={}",
        header.version, header.sort, header.language, header.voice, count
    );

    Ok((header, count))
}

/// Writes the header followed by the entry count.
pub fn write<W: Write>(writer: &mut W, header: &ContainerHeader, count: u16) -> Result<()> {
    if header.version == 0 || header.version > VERSION_MASK {
        return Err(SubpError::UnsupportedVersion(header.version));
    }
    writer.write_u8(FORMAT_TAG)?;
    writer.write_u8(pack_control(header))?;
    if header.is_extended() {
        writer.write_u8(header.language.unwrap_or_default())?;
        writer.write_u8(header.voice)?;
    }
    writer.write_u16::<LittleEndian>(count)?;
    Ok(())
}
