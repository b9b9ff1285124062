//! # subp-tool
//!
//! Reader and writer for Fox Engine subtitle pack (`.subp`) files: a container
//! of text records addressed by the `StrCode32` hash of their identifier, with
//! an index table of `(hash, offset)` pairs in front of the payload.
//!
//! Hashes are turned back into readable identifiers with a
//! [`HashDictionary`] built from a word list. Containers convert to and from
//! an editable XML document.
pub mod subp;

// Re-export the main types for convenience
pub use subp::{
    codec::{
        hash::{str_code32, str_code64},
        text::EncodingPolicy,
    },
    convert::{pack_file, unpack_file, ConvertOptions},
    document::Document,
    types::models::{ContainerHeader, Entry, IndexRecord, Language, Line, SortOrder},
    Container, HashDictionary, Result, SubpError,
};
