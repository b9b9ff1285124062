//! Custom error types for the subp-tool crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum SubpError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The word list used to build the hash dictionary could not be read.
    #[error("Unable to read the dictionary {}: {source}", path.display())]
    Dictionary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The leading format tag is not the subtitle pack discriminator.
    #[error("Invalid format tag: expected {expected:#04x}, found {found:#04x}")]
    InvalidMagic { expected: u8, found: u8 },

    /// The header declares a sub-version this codec cannot lay out.
    #[error("Unsupported container sub-version: {0}")]
    UnsupportedVersion(u8),

    /// The declared entry count needs more index bytes than the stream holds.
    #[error("Entry count {count} needs {required} index bytes, but only {available} bytes remain")]
    CountMismatch {
        count: u16,
        required: u64,
        available: u64,
    },

    /// An index record points outside the payload region.
    #[error("Offset {offset:#x} of entry {hash:#010x} is outside the payload region [{start:#x}, {end:#x})")]
    OffsetOutOfBounds {
        hash: u32,
        offset: u32,
        start: u64,
        end: u64,
    },

    /// A structure runs past the end of the stream.
    #[error("Unexpected end of data while reading {context} at offset {offset:#x}")]
    Truncated { context: &'static str, offset: u64 },

    /// The container holds more entries than the 16-bit count field can express.
    #[error("Too many entries: {0} (maximum is 65535)")]
    TooManyEntries(usize),

    /// A value does not fit into its on-disk field.
    #[error("Value {value} does not fit into the {context} field")]
    FieldOverflow { context: &'static str, value: u64 },

    /// Payload bytes are not valid in the resolved text encoding.
    #[error("Entry {hash:#010x} contains bytes that are not valid {encoding}")]
    Decode { hash: u32, encoding: &'static str },

    /// Entry text contains characters the resolved text encoding cannot represent.
    #[error("Entry {hash:#010x} contains characters that cannot be encoded as {encoding}")]
    Encode { hash: u32, encoding: &'static str },

    /// The intermediate document does not match the expected schema.
    #[error("Invalid document: {0}")]
    Document(String),

    /// An encoding label or selector could not be mapped to a text encoding.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),
}

/// A convenience `Result` type alias using the crate's `SubpError` type.
pub type Result<T> = std::result::Result<T, SubpError>;
