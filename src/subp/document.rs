//! Human-editable XML form of a container.
//!
//! The mapping is written out by hand so the document schema is an explicit
//! contract:
//!
//! ```text
//! <SubpFile Version="2" Sort="Localized" Language="7" Voice="0" Reserved="0" Encoding="ISO-8859-5">
//!   <Entries>
//!     <Entry Hash="2309811713" Id="HELLO" Flags="0">
//!       <Line Start="0" End="90">text</Line>
//!     </Entry>
//!   </Entries>
//! </SubpFile>
//! ```
//!
//! Unknown elements and attributes are warnings; malformed values and missing
//! required attributes are errors.

use std::fmt::Display;

use encoding_rs::Encoding;
use log::{debug, warn};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::container::Container;
use super::types::error::{Result, SubpError};
use super::types::models::{ContainerHeader, Entry, Line, SortOrder};
use super::utils;

const ROOT: &[u8] = b"SubpFile";
const ENTRIES: &[u8] = b"Entries";
const ENTRY: &[u8] = b"Entry";
const LINE: &[u8] = b"Line";

/// A parsed document: the container plus the encoding it declares.
#[derive(Debug, Clone)]
pub struct Document {
    pub container: Container,
    pub declared_encoding: Option<&'static Encoding>,
}

impl Container {
    /// Serializes the container as an XML document declaring `encoding`.
    pub fn to_xml(&self, encoding: &'static Encoding) -> Result<String> {
        write(self, encoding)
    }
}

fn xml_error(e: impl Display) -> SubpError {
    SubpError::Document(e.to_string())
}

/// Serializes `container`, recording `encoding` as the declared encoding.
pub fn write(container: &Container, encoding: &'static Encoding) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;

    let header = &container.header;
    let version = header.version.to_string();
    let reserved = header.reserved.to_string();
    let language = header.language.unwrap_or_default().to_string();
    let voice = header.voice.to_string();
    let mut root = BytesStart::new("SubpFile");
    root.push_attribute(("Version", version.as_str()));
    root.push_attribute(("Sort", header.sort.name()));
    if header.is_extended() {
        root.push_attribute(("Language", language.as_str()));
        root.push_attribute(("Voice", voice.as_str()));
    }
    if header.reserved != 0 {
        root.push_attribute(("Reserved", reserved.as_str()));
    }
    root.push_attribute(("Encoding", encoding.name()));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    if container.entries.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new("Entries")))
            .map_err(xml_error)?;
    } else {
        writer
            .write_event(Event::Start(BytesStart::new("Entries")))
            .map_err(xml_error)?;
        for entry in &container.entries {
            write_entry(&mut writer, entry)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Entries")))
            .map_err(xml_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("SubpFile")))
        .map_err(xml_error)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
    xml.push('\n');
    Ok(xml)
}

fn write_entry(writer: &mut Writer<Vec<u8>>, entry: &Entry) -> Result<()> {
    let hash = entry.hash.to_string();
    let flags = entry.flags.to_string();
    let mut element = BytesStart::new("Entry");
    element.push_attribute(("Hash", hash.as_str()));
    if let Some(id) = entry.id.as_deref() {
        element.push_attribute(("Id", id));
    }
    element.push_attribute(("Flags", flags.as_str()));

    if entry.lines.is_empty() {
        return writer.write_event(Event::Empty(element)).map_err(xml_error);
    }

    writer.write_event(Event::Start(element)).map_err(xml_error)?;
    for line in &entry.lines {
        let start = line.start.to_string();
        let end = line.end.to_string();
        let mut element = BytesStart::new("Line");
        element.push_attribute(("Start", start.as_str()));
        element.push_attribute(("End", end.as_str()));
        // Empty lines become empty elements so indentation never turns into text.
        if line.text.is_empty() {
            writer.write_event(Event::Empty(element)).map_err(xml_error)?;
        } else {
            writer.write_event(Event::Start(element)).map_err(xml_error)?;
            writer
                .write_event(Event::Text(escape_text(&line.text)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new("Line")))
                .map_err(xml_error)?;
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new("Entry")))
        .map_err(xml_error)
}

/// Escapes markup characters and writes carriage returns as `&#xD;`.
fn escape_text(text: &str) -> BytesText<'static> {
    let escaped = escape(text).replace('\r', "&#xD;");
    BytesText::from_escaped(escaped)
}

/// Where the parser currently is in the element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Document,
    Root,
    Entries,
    Entry,
    Line,
    Done,
}

/// Parses a document back into a container.
pub fn parse(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut skip_buf = Vec::new();

    let mut scope = Scope::Document;
    let mut container = Container::default();
    let mut declared_encoding = None;
    let mut entry: Option<Entry> = None;
    let mut line: Option<Line> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            SubpError::Document(format!(
                "Failed to read XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                match (scope, name.as_ref()) {
                    (Scope::Document, ROOT) => {
                        let (header, encoding) = parse_root(e)?;
                        container.header = header;
                        declared_encoding = encoding;
                        scope = if is_empty { Scope::Done } else { Scope::Root };
                    }
                    (Scope::Document, other) => {
                        return Err(SubpError::Document(format!(
                            "Expected root element <SubpFile>, found <{}>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                    (Scope::Root, ENTRIES) => {
                        if !is_empty {
                            scope = Scope::Entries;
                        }
                    }
                    (Scope::Entries, ENTRY) => {
                        let parsed = parse_entry(e)?;
                        if is_empty {
                            container.entries.push(parsed);
                        } else {
                            entry = Some(parsed);
                            scope = Scope::Entry;
                        }
                    }
                    (Scope::Entry, LINE) => {
                        let parsed = parse_line(e)?;
                        if is_empty {
                            if let Some(current) = entry.as_mut() {
                                current.lines.push(parsed);
                            }
                        } else {
                            line = Some(parsed);
                            scope = Scope::Line;
                        }
                    }
                    (_, other) => {
                        warn!(
                            "Ignoring unexpected element <{}> at position {}",
                            String::from_utf8_lossy(other),
                            reader.buffer_position()
                        );
                        if !is_empty {
                            let end = e.to_end().into_owned();
                            reader
                                .read_to_end_into(end.name(), &mut skip_buf)
                                .map_err(xml_error)?;
                            skip_buf.clear();
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape().map_err(xml_error)?;
                match (scope, line.as_mut()) {
                    (Scope::Line, Some(current)) => current.text.push_str(&text),
                    _ if text.trim().is_empty() => {}
                    _ => warn!("Ignoring stray text '{}'", text.trim()),
                }
            }
            Event::CData(ref c) => {
                if let (Scope::Line, Some(current)) = (scope, line.as_mut()) {
                    let text = std::str::from_utf8(c).map_err(xml_error)?;
                    current.text.push_str(text);
                } else {
                    warn!("Ignoring CDATA section outside of <Line>");
                }
            }
            Event::End(ref e) => match (scope, e.name().as_ref()) {
                (Scope::Line, LINE) => {
                    if let (Some(current), Some(finished)) = (entry.as_mut(), line.take()) {
                        current.lines.push(finished);
                    }
                    scope = Scope::Entry;
                }
                (Scope::Entry, ENTRY) => {
                    if let Some(finished) = entry.take() {
                        container.entries.push(finished);
                    }
                    scope = Scope::Entries;
                }
                (Scope::Entries, ENTRIES) => scope = Scope::Root,
                (Scope::Root, ROOT) => scope = Scope::Done,
                (_, other) => {
                    return Err(SubpError::Document(format!(
                        "Unexpected closing tag </{}>",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if scope != Scope::Done {
        return Err(SubpError::Document(
            "Document ended before </SubpFile>".to_string(),
        ));
    }

    debug!(
        "Parsed document: {} entries, sort={}, encoding={:?}",
        container.entries.len(),
        container.header.sort,
        declared_encoding.map(Encoding::name)
    );

    Ok(Document {
        container,
        declared_encoding,
    })
}

/// Extracts all attributes of an element as `(name, value)` pairs.
fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    e.attributes()
        .map(|attr_result| {
            let attr = attr_result
                .map_err(|e| SubpError::Document(format!("Failed to parse XML attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| SubpError::Document(format!("Failed to decode XML value: {}", e)))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

fn parse_number<T: TryFrom<u64>>(value: &str, element: &str, attribute: &str) -> Result<T> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| {
            SubpError::Document(format!(
                "Invalid value '{}' for attribute {} of <{}>",
                value, attribute, element
            ))
        })
}

fn parse_root(e: &BytesStart) -> Result<(ContainerHeader, Option<&'static Encoding>)> {
    let mut version: Option<u8> = None;
    let mut sort = SortOrder::Unsorted;
    let mut reserved = 0u8;
    let mut language: Option<u8> = None;
    let mut voice = 0u8;
    let mut encoding = None;

    for (key, value) in attributes(e)? {
        match key.as_str() {
            "Version" => version = Some(parse_number(&value, "SubpFile", "Version")?),
            "Sort" => sort = value.parse()?,
            "Reserved" => reserved = parse_number(&value, "SubpFile", "Reserved")?,
            "Language" => language = Some(parse_number(&value, "SubpFile", "Language")?),
            "Voice" => voice = parse_number(&value, "SubpFile", "Voice")?,
            "Encoding" => encoding = Some(utils::parse_encoding(&value)?),
            other => warn!("Ignoring unknown attribute {} on <SubpFile>", other),
        }
    }

    let version = version.unwrap_or(if language.is_some() {
        ContainerHeader::EXTENDED_VERSION
    } else {
        ContainerHeader::LEGACY_VERSION
    });
    if version == 0 || version > 0x0F {
        return Err(SubpError::Document(format!(
            "Version {} is outside the range 1-15",
            version
        )));
    }
    if reserved > 0b11 {
        return Err(SubpError::Document(format!(
            "Reserved bits {} do not fit into two bits",
            reserved
        )));
    }

    let mut header = ContainerHeader {
        version,
        sort,
        reserved,
        language: None,
        voice: 0,
    };
    if header.is_extended() {
        header.language = Some(language.unwrap_or_default());
        header.voice = voice;
    } else if language.is_some() || voice != 0 {
        warn!("Version {} headers carry no language or voice; ignoring them", version);
    }

    Ok((header, encoding))
}

fn parse_entry(e: &BytesStart) -> Result<Entry> {
    let mut hash: Option<u32> = None;
    let mut id: Option<String> = None;
    let mut flags = 0u8;

    for (key, value) in attributes(e)? {
        match key.as_str() {
            "Hash" => hash = Some(parse_number(&value, "Entry", "Hash")?),
            "Id" => id = Some(value).filter(|v| !v.is_empty()),
            "Flags" => flags = parse_number(&value, "Entry", "Flags")?,
            other => warn!("Ignoring unknown attribute {} on <Entry>", other),
        }
    }

    let mut entry = match (hash, id) {
        (_, Some(id)) => Entry::with_id(id),
        (Some(hash), None) => Entry::with_hash(hash),
        (None, None) => {
            return Err(SubpError::Document(
                "<Entry> needs a Hash or an Id attribute".to_string(),
            ));
        }
    };
    if let Some(hash) = hash {
        if hash != entry.hash {
            debug!(
                "Entry '{}' hash {:#010x} is stale; using {:#010x}",
                entry.id.as_deref().unwrap_or_default(),
                hash,
                entry.hash
            );
        }
    }
    entry.flags = flags;
    Ok(entry)
}

fn parse_line(e: &BytesStart) -> Result<Line> {
    let mut start: Option<u32> = None;
    let mut end: Option<u32> = None;

    for (key, value) in attributes(e)? {
        match key.as_str() {
            "Start" => start = Some(parse_number(&value, "Line", "Start")?),
            "End" => end = Some(parse_number(&value, "Line", "End")?),
            other => warn!("Ignoring unknown attribute {} on <Line>", other),
        }
    }

    match (start, end) {
        (Some(start), Some(end)) => Ok(Line::new(start, end, String::new())),
        _ => Err(SubpError::Document(
            "<Line> needs both Start and End attributes".to_string(),
        )),
    }
}
