//! Small shared helpers.

use encoding_rs::Encoding;

use super::codec::text;
use super::types::error::{Result, SubpError};
use super::types::models::Language;

/// Resolves an encoding from a language selector (`-rus`, `jpn`) or a WHATWG
/// label (`utf-8`, `iso-8859-5`, `windows-1252`).
pub fn parse_encoding(label: &str) -> Result<&'static Encoding> {
    if let Some(language) = Language::from_selector(label) {
        return Ok(text::encoding_for_language(language));
    }
    // UTF-16 and `replacement` would silently encode as UTF-8.
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| encoding.output_encoding() == *encoding)
        .ok_or_else(|| SubpError::UnknownEncoding(label.to_string()))
}

/// Narrows a length or position into an on-disk field.
pub fn narrow<T: TryFrom<u64>>(value: u64, context: &'static str) -> Result<T> {
    T::try_from(value).map_err(|_| SubpError::FieldOverflow { context, value })
}
