//! Text encoding selection and strict payload text transcoding.
//!
//! Exactly one encoding is active for all payload text of a container. Which
//! one is decided by [`EncodingPolicy::resolve`], highest priority first:
//! 1. The header language, when the sort-order class marks it authoritative
//! 2. The encoding requested by the caller (CLI selector)
//! 3. The encoding declared on the intermediate document
//! 4. [`default_encoding`]

use std::borrow::Cow;

use encoding_rs::{Encoding, ISO_8859_5, UTF_8, WINDOWS_1252};
use log::info;

use crate::subp::types::error::{Result, SubpError};
use crate::subp::types::models::{ContainerHeader, Language};

/// Encoding used when nothing else applies: single-byte Western.
pub fn default_encoding() -> &'static Encoding {
    WINDOWS_1252
}

/// Maps a language to the encoding its payload text is stored in.
pub fn encoding_for_language(language: Language) -> &'static Encoding {
    match language {
        Language::Japanese | Language::Portuguese | Language::Arabic => UTF_8,
        Language::Russian => ISO_8859_5,
        Language::English
        | Language::French
        | Language::Italian
        | Language::German
        | Language::Spanish => WINDOWS_1252,
    }
}

/// Maps a raw header language id; unknown ids fall back to the default.
pub fn encoding_for_language_id(id: u8) -> &'static Encoding {
    Language::from_id(id)
        .map(encoding_for_language)
        .unwrap_or_else(default_encoding)
}

/// The competing encoding requests for one container.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingPolicy {
    /// Explicit request from the caller.
    pub requested: Option<&'static Encoding>,
    /// Encoding declared by the intermediate document.
    pub declared: Option<&'static Encoding>,
}

impl EncodingPolicy {
    pub fn new(requested: Option<&'static Encoding>) -> Self {
        Self {
            requested,
            declared: None,
        }
    }

    pub fn with_declared(mut self, declared: Option<&'static Encoding>) -> Self {
        self.declared = declared;
        self
    }

    /// Picks the single encoding for all payload text of a container.
    pub fn resolve(&self, header: &ContainerHeader) -> &'static Encoding {
        let fallback = self
            .requested
            .or(self.declared)
            .unwrap_or_else(default_encoding);

        let embedded = match header.language {
            Some(id) if header.is_extended() && header.sort.is_header_authoritative() => {
                Some(encoding_for_language_id(id))
            }
            _ => None,
        };

        match embedded {
            Some(embedded) => {
                if embedded != fallback && (self.requested.is_some() || self.declared.is_some()) {
                    info!(
                        "Text encoding overridden by header: requested='{}', final='{}'",
                        fallback.name(),
                        embedded.name()
                    );
                }
                embedded
            }
            None => fallback,
        }
    }
}

/// Decodes payload bytes, failing on any malformed sequence.
pub fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding, hash: u32) -> Result<Cow<'a, str>> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or(SubpError::Decode {
            hash,
            encoding: encoding.name(),
        })
}

/// Encodes text, failing on characters the encoding cannot represent and on
/// encodings that have no encoder of their own (UTF-16, `replacement`).
pub fn encode_strict<'a>(text: &'a str, encoding: &'static Encoding, hash: u32) -> Result<Cow<'a, [u8]>> {
    let (bytes, used, had_errors) = encoding.encode(text);
    if had_errors || used != encoding {
        return Err(SubpError::Encode {
            hash,
            encoding: encoding.name(),
        });
    }
    Ok(bytes)
}
