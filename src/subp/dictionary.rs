//! Reverse lookup from `StrCode32` hashes to identifiers.
//!
//! The dictionary is built once from a newline-delimited word list and is
//! read-only afterwards, so a single instance can be shared by reference
//! across every file of a batch.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use encoding_rs::UTF_8;
use log::{debug, info, warn};

use super::codec::hash;
use super::types::error::{Result, SubpError};

/// Word list looked up when no path is given on the command line.
pub const DEFAULT_DICTIONARY_PATH: &str = "subp_dictionary.txt";

#[derive(Debug, Default, Clone)]
pub struct HashDictionary {
    entries: HashMap<u32, String>,
    collisions: usize,
}

impl HashDictionary {
    /// An empty dictionary; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the dictionary from a word list, degrading to an empty
    /// dictionary if the file cannot be read.
    ///
    /// The failure is reported as a warning; conversion continues with hashes
    /// as the only identity of every entry.
    pub fn build(path: impl AsRef<Path>) -> Self {
        match Self::try_build(path) {
            Ok(dictionary) => dictionary,
            Err(e) => {
                warn!("{}", e);
                Self::new()
            }
        }
    }

    /// Builds the dictionary from a word list, failing on I/O errors.
    pub fn try_build(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|source| SubpError::Dictionary {
            path: path.to_path_buf(),
            source,
        })?;
        // Drops a leading byte order mark.
        let (content, _, _) = UTF_8.decode(&raw);
        let dictionary = Self::from_lines(content.lines());
        info!(
            "Loaded dictionary {}: {} identifiers, {} collisions",
            path.display(),
            dictionary.len(),
            dictionary.collisions
        );
        Ok(dictionary)
    }

    /// Hashes every non-empty line. A later line replaces an earlier one with
    /// the same hash.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = Self::new();
        for line in lines {
            let value = line.as_ref().trim_end_matches('\r');
            if value.is_empty() {
                continue;
            }
            let code = hash::str_code32(value.as_bytes());
            if let Some(previous) = dictionary.entries.insert(code, value.to_string()) {
                if previous != value {
                    debug!(
                        "StrCode32 collision detected ({:#010x}). Overwriting '{}' with '{}'",
                        code, previous, value
                    );
                    dictionary.collisions += 1;
                }
            }
        }
        dictionary
    }

    pub fn resolve(&self, hash: u32) -> Option<&str> {
        self.entries.get(&hash).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct lines that were replaced by a later colliding line.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
