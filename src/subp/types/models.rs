//! Core data structures for subtitle pack components.
//!
//! This module defines the fundamental types used throughout the library:
//! - Header metadata (sort-order class, language, voice)
//! - Entries and their timed lines
//! - Index records

use std::fmt;
use std::str::FromStr;

use super::error::{Result, SubpError};
use crate::subp::codec::hash;

/// Sort-order class packed into bits 6-7 of the header control byte.
///
/// The class decides two things: whether entries are sorted by hash before
/// writing, and whether the language stored in the header is authoritative for
/// the text encoding of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Entries keep their list order; the caller picks the encoding.
    #[default]
    Unsorted = 0,
    /// Entries are stored sorted by hash.
    Ascending = 1,
    /// The header language selects the payload encoding.
    Localized = 2,
    /// Sorted by hash, and the header language selects the encoding.
    LocalizedAscending = 3,
}

impl SortOrder {
    /// Decodes the two sort bits. Only the low two bits of `bits` are used.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Unsorted,
            1 => Self::Ascending,
            2 => Self::Localized,
            _ => Self::LocalizedAscending,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Entries must be sorted by hash before they are laid out.
    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Ascending | Self::LocalizedAscending)
    }

    /// The header language overrides any caller-requested encoding.
    pub fn is_header_authoritative(self) -> bool {
        matches!(self, Self::Localized | Self::LocalizedAscending)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unsorted => "Unsorted",
            Self::Ascending => "Ascending",
            Self::Localized => "Localized",
            Self::LocalizedAscending => "LocalizedAscending",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortOrder {
    type Err = SubpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Unsorted" => Ok(Self::Unsorted),
            "Ascending" => Ok(Self::Ascending),
            "Localized" => Ok(Self::Localized),
            "LocalizedAscending" => Ok(Self::LocalizedAscending),
            _ => Err(SubpError::Document(format!("Unknown sort order '{}'", s))),
        }
    }
}

/// Languages known to the engine, keyed by the id stored in extended headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese = 0,
    English = 1,
    French = 2,
    Italian = 3,
    German = 4,
    Spanish = 5,
    Portuguese = 6,
    Russian = 7,
    Arabic = 8,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Self::Japanese,
        Self::English,
        Self::French,
        Self::Italian,
        Self::German,
        Self::Spanish,
        Self::Portuguese,
        Self::Russian,
        Self::Arabic,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// The three-letter command-line selector (`jpn`, `eng`, ...).
    pub fn selector(self) -> &'static str {
        match self {
            Self::Japanese => "jpn",
            Self::English => "eng",
            Self::French => "fre",
            Self::Italian => "ita",
            Self::German => "ger",
            Self::Spanish => "spa",
            Self::Portuguese => "por",
            Self::Russian => "rus",
            Self::Arabic => "ara",
        }
    }

    /// Parses a selector with or without its leading dash, case-insensitively.
    pub fn from_selector(selector: &str) -> Option<Self> {
        let wanted = selector.trim_start_matches('-').to_ascii_lowercase();
        Self::ALL.iter().copied().find(|l| l.selector() == wanted)
    }
}

/// Decoded container header.
///
/// Legacy files (sub-version 1) only carry the format tag and the control byte;
/// extended files (sub-version 2 and later) add a language id and a voice id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Sub-version nibble (1..=15).
    pub version: u8,
    pub sort: SortOrder,
    /// Bits 4-5 of the control byte, kept so unknown flags survive a round trip.
    pub reserved: u8,
    /// Raw language id; `None` for legacy headers.
    pub language: Option<u8>,
    /// Raw voice id; always 0 for legacy headers.
    pub voice: u8,
}

impl ContainerHeader {
    pub const LEGACY_VERSION: u8 = 1;
    pub const EXTENDED_VERSION: u8 = 2;

    /// Header of a historical file: `13 01`, unsorted, no language.
    pub fn legacy() -> Self {
        Self {
            version: Self::LEGACY_VERSION,
            sort: SortOrder::Unsorted,
            reserved: 0,
            language: None,
            voice: 0,
        }
    }

    pub fn extended(sort: SortOrder, language: u8, voice: u8) -> Self {
        Self {
            version: Self::EXTENDED_VERSION,
            sort,
            reserved: 0,
            language: Some(language),
            voice,
        }
    }

    /// Whether this header carries the language and voice bytes on disk.
    pub fn is_extended(&self) -> bool {
        self.version >= Self::EXTENDED_VERSION
    }

    pub fn known_language(&self) -> Option<Language> {
        self.language.and_then(Language::from_id)
    }
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self::legacy()
    }
}

/// One timed subtitle line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Line {
    pub fn new(start: u32, end: u32, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// A single record of a container.
///
/// The hash is the only identity stored on disk. `id` is present when the
/// dictionary resolved the hash or a user supplied it in the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub hash: u32,
    pub id: Option<String>,
    /// Opaque auxiliary byte stored next to the line count.
    pub flags: u8,
    pub lines: Vec<Line>,
}

impl Entry {
    /// An entry known only by its hash.
    pub fn with_hash(hash: u32) -> Self {
        Self {
            hash,
            ..Self::default()
        }
    }

    /// An entry named by an identifier; the hash is derived from it.
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            hash: hash::str_code32(id.as_bytes()),
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn push_line(&mut self, line: Line) -> &mut Self {
        self.lines.push(line);
        self
    }

    /// Recomputes the hash from the identifier, if there is one.
    ///
    /// Returns `true` when the stored hash changed.
    pub fn update_hash(&mut self) -> bool {
        match self.id.as_deref() {
            Some(id) => {
                let fresh = hash::str_code32(id.as_bytes());
                let changed = fresh != self.hash;
                self.hash = fresh;
                changed
            }
            None => false,
        }
    }

    /// All line texts joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One `(hash, offset)` pair of the index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub hash: u32,
    /// Absolute byte offset of the entry payload from the container start.
    pub offset: u32,
}
