//! Core subtitle pack module.
//!
//! # Module Organization
//!
//! - [`codec`]: `StrCode32` hashing and text encoding policy
//! - [`format`]: Header, index table and entry record layouts
//! - [`container`]: Whole-file read and two-pass write
//! - [`dictionary`]: Hash to identifier reverse lookup
//! - [`document`]: Explicit XML mapping of a container
//! - [`convert`]: One-file unpack/pack drivers
//! - [`types`]: Data model and error types

pub mod codec;
pub mod container;
pub mod convert;
pub mod dictionary;
pub mod document;
pub mod format;
pub mod types;
pub mod utils;

pub use container::Container;
pub use dictionary::HashDictionary;
pub use types::error::{Result, SubpError};
