use std::fs;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, info, trace};

use super::codec::text::EncodingPolicy;
use super::dictionary::HashDictionary;
use super::format::{entry, header, index};
use super::types::error::{Result, SubpError};
use super::types::models::{ContainerHeader, Entry, IndexRecord};
use super::utils;

/// In-memory model of one subtitle pack: header metadata plus the ordered
/// entry list.
///
/// Entry order is preserved on read. On write it only changes when the sort
/// class asks for ascending hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub header: ContainerHeader,
    pub entries: Vec<Entry>,
}

impl Container {
    pub fn new(header: ContainerHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
        }
    }

    /// Reads a container file from disk.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The format tag, entry count or any index offset is invalid
    /// - Payload text is not valid in the resolved encoding
    pub fn open(
        path: impl AsRef<Path>,
        policy: &EncodingPolicy,
        dictionary: &HashDictionary,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening subtitle pack: {}", path.display());
        let data = fs::read(path)?;
        Self::from_bytes(&data, policy, dictionary)
    }

    /// Decodes a whole container held in memory.
    pub fn from_bytes(
        data: &[u8],
        policy: &EncodingPolicy,
        dictionary: &HashDictionary,
    ) -> Result<Self> {
        let (header, records) = read_index(data)?;
        let encoding = policy.resolve(&header);
        let payload = payload_region(&header, records.len(), data.len());
        debug!(
            "Decoding {} entries as {} (payload region {:#x}..{:#x})",
            records.len(),
            encoding.name(),
            payload.start,
            payload.end
        );

        let mut entries = Vec::with_capacity(records.len());
        let mut resolved = 0;
        for record in &records {
            index::check_bounds(record, &payload)?;
            let mut entry = entry::parse(data, record.offset as usize, encoding, record.hash)?;
            if let Some(id) = dictionary.resolve(record.hash) {
                trace!("Resolved {:#010x} -> '{}'", record.hash, id);
                entry.id = Some(id.to_string());
                resolved += 1;
            }
            entries.push(entry);
        }

        info!(
            "Read {} entries ({} identifiers resolved, sort={})",
            entries.len(),
            resolved,
            header.sort
        );

        Ok(Self { header, entries })
    }

    /// The single text encoding used for this container's payload.
    pub fn encoding(&self, policy: &EncodingPolicy) -> &'static Encoding {
        policy.resolve(&self.header)
    }

    /// Writes the container with the two-pass layout.
    ///
    /// 1. Header and entry count
    /// 2. Zeroed space for the index table
    /// 3. Entry records, remembering where each one starts
    /// 4. Seek back and fill in the index table, then return to the end
    ///
    /// Hashes are recomputed from identifiers first, so a hand-edited
    /// identifier always wins over a stale hash. Offsets are relative to the
    /// writer position at the time of the call.
    pub fn write_to<W: Write + Seek>(&mut self, writer: &mut W, policy: &EncodingPolicy) -> Result<()> {
        let count = u16::try_from(self.entries.len())
            .map_err(|_| SubpError::TooManyEntries(self.entries.len()))?;
        let encoding = policy.resolve(&self.header);

        let rehashed = self
            .entries
            .iter_mut()
            .map(Entry::update_hash)
            .filter(|changed| *changed)
            .count();
        if rehashed > 0 {
            debug!("Recomputed {} hashes from edited identifiers", rehashed);
        }
        if self.header.sort.is_ascending() {
            // Stable: equal hashes keep their relative order.
            self.entries.sort_by_key(|e| e.hash);
        }

        let base = writer.stream_position()?;
        header::write(writer, &self.header, count)?;

        let table_pos = writer.stream_position()?;
        writer.write_all(&vec![0u8; index::table_len(self.entries.len())])?;

        let mut records = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let offset: u32 = utils::narrow(writer.stream_position()? - base, "entry offset")?;
            entry::write(writer, entry, encoding)?;
            trace!("Wrote entry {:#010x} at {:#x}", entry.hash, offset);
            records.push(IndexRecord {
                hash: entry.hash,
                offset,
            });
        }

        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(table_pos))?;
        index::write(writer, &records)?;
        writer.seek(SeekFrom::Start(end))?;

        info!(
            "Wrote {} entries as {} ({} bytes, sort={})",
            records.len(),
            encoding.name(),
            end - base,
            self.header.sort
        );
        Ok(())
    }

    /// Encodes the container into a fresh buffer.
    pub fn to_bytes(&mut self, policy: &EncodingPolicy) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor, policy)?;
        Ok(cursor.into_inner())
    }

    /// Encodes the container and persists it only once encoding succeeded.
    pub fn save(&mut self, path: impl AsRef<Path>, policy: &EncodingPolicy) -> Result<()> {
        let bytes = self.to_bytes(policy)?;
        fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Distinct entry hashes in ascending order.
    pub fn unique_hashes(&self) -> Vec<u32> {
        let mut hashes: Vec<u32> = self.entries.iter().map(|e| e.hash).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes
    }
}

/// Parses the header and index table without decoding any payload.
pub fn read_index(data: &[u8]) -> Result<(ContainerHeader, Vec<IndexRecord>)> {
    let (header, count) = header::parse(data)?;
    let records = index::parse(data, header::encoded_len(&header), count)?;
    Ok((header, records))
}

/// Byte range that index offsets must fall into.
pub fn payload_region(header: &ContainerHeader, count: usize, file_len: usize) -> std::ops::Range<u64> {
    let start = header::encoded_len(header) + index::table_len(count);
    start as u64..file_len as u64
}
