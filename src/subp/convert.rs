//! File-level conversions between `.subp` containers and XML documents.
//!
//! Each call converts exactly one file. Outputs are encoded completely in
//! memory before anything is written, so a failed conversion never leaves a
//! half-written file behind.

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use log::info;

use super::codec::text::EncodingPolicy;
use super::container::Container;
use super::dictionary::HashDictionary;
use super::document;
use super::types::error::Result;

/// Caller-controlled conversion settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Encoding requested on the command line.
    pub encoding: Option<&'static Encoding>,
    /// Also write the sorted list of unique entry hashes.
    pub output_hashes: bool,
}

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutput {
    pub path: PathBuf,
    pub hashes_path: Option<PathBuf>,
    pub entries: usize,
}

/// `dir/name.subp` -> `dir/name.xml`
pub fn document_path(container_path: &Path) -> PathBuf {
    container_path.with_extension("xml")
}

/// `dir/name.xml` -> `dir/name.subp`
pub fn container_path(document_path: &Path) -> PathBuf {
    document_path.with_extension("subp")
}

/// `dir/name.subp` -> `dir/name.subp_subpIdHashes.txt`
pub fn hashes_path(container_path: &Path) -> PathBuf {
    let file_name = container_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    container_path.with_file_name(format!("{}_subpIdHashes.txt", file_name))
}

/// Converts a `.subp` file into an XML document next to it.
pub fn unpack_file(
    path: impl AsRef<Path>,
    options: &ConvertOptions,
    dictionary: &HashDictionary,
) -> Result<ConvertOutput> {
    let path = path.as_ref();
    let policy = EncodingPolicy::new(options.encoding);
    let container = Container::open(path, &policy, dictionary)?;
    let xml = container.to_xml(container.encoding(&policy))?;

    let output_path = document_path(path);
    fs::write(&output_path, xml)?;
    info!("Unpacked {} -> {}", path.display(), output_path.display());

    let hashes_path = if options.output_hashes {
        let target = hashes_path(path);
        export_hashes(&container, &target)?;
        Some(target)
    } else {
        None
    };

    Ok(ConvertOutput {
        path: output_path,
        hashes_path,
        entries: container.entries.len(),
    })
}

/// Converts an XML document into a `.subp` file next to it.
pub fn pack_file(path: impl AsRef<Path>, options: &ConvertOptions) -> Result<ConvertOutput> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    let parsed = document::parse(&xml)?;
    let policy = EncodingPolicy::new(options.encoding).with_declared(parsed.declared_encoding);

    let mut container = parsed.container;
    let output_path = container_path(path);
    container.save(&output_path, &policy)?;
    info!("Packed {} -> {}", path.display(), output_path.display());

    Ok(ConvertOutput {
        path: output_path,
        hashes_path: None,
        entries: container.entries.len(),
    })
}

/// Writes the unique entry hashes, ascending, one decimal value per line.
pub fn export_hashes(container: &Container, path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::new();
    for hash in container.unique_hashes() {
        out.push_str(&hash.to_string());
        out.push('\n');
    }
    fs::write(path.as_ref(), out)?;
    Ok(())
}
