//! On-disk layout of subtitle pack containers.
//!
//! This module provides the mid-level layer between raw bytes and the
//! high-level [`Container`](crate::subp::container::Container).
//!
//! ```text
//! File Structure:
//! ┌─────────────────┐
//! │  Header         │ ← header::parse() / header::write()
//! ├─────────────────┤
//! │  Index Table    │ ← index::parse() / index::write()
//! │  (hash, offset) │
//! ├─────────────────┤
//! │  Entry Records  │ ← entry::parse() / entry::write()
//! │  (variable      │
//! │   length)       │
//! └─────────────────┘
//! ```

pub mod entry;
pub mod header;
pub mod index;
