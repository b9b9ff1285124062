//! Codec layer: string hashing and text transcoding.
//!
//! # Submodules
//!
//! - [`hash`][]: `StrCode32`/`StrCode64` on top of CityHash64
//! - [`text`][]: Encoding resolution and strict decode/encode of payload text

pub mod hash;
pub mod text;
