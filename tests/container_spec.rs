use encoding_rs::{UTF_8, WINDOWS_1252};
use subp_tool::subp::container::{payload_region, read_index};
use subp_tool::{
    str_code32, Container, ContainerHeader, EncodingPolicy, Entry, HashDictionary, Language, Line,
    SortOrder, SubpError,
};

/// Legacy container with two entries, laid out by hand.
///
/// ```text
/// 13 01 02 00                      header, 2 entries
/// 22 22 00 00 14 00 00 00          index: 0x2222 @ 20
/// 11 11 00 00 25 00 00 00          index: 0x1111 @ 37
/// 01 00 | 0 | 90 | 5 "Hello"       entry 0x2222 (17 bytes)
/// 02 07 | 10 | 20 | 2 "ab" | 30 | 40 | 0   entry 0x1111 (24 bytes)
/// ```
fn legacy_fixture() -> Vec<u8> {
    let mut data = vec![0x13, 0x01, 0x02, 0x00];
    data.extend_from_slice(&0x2222u32.to_le_bytes());
    data.extend_from_slice(&20u32.to_le_bytes());
    data.extend_from_slice(&0x1111u32.to_le_bytes());
    data.extend_from_slice(&37u32.to_le_bytes());

    data.extend_from_slice(&[0x01, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&90u32.to_le_bytes());
    data.extend_from_slice(&5u16.to_le_bytes());
    data.extend_from_slice(b"Hello");

    data.extend_from_slice(&[0x02, 0x07]);
    data.extend_from_slice(&10u32.to_le_bytes());
    data.extend_from_slice(&20u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(b"ab");
    data.extend_from_slice(&30u32.to_le_bytes());
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data
}

fn entry(hash: u32, text: &str) -> Entry {
    let mut entry = Entry::with_hash(hash);
    entry.push_line(Line::new(0, 60, text));
    entry
}

fn default_policy() -> EncodingPolicy {
    EncodingPolicy::default()
}

fn assert_offsets_in_payload(data: &[u8]) {
    let (header, records) = read_index(data).expect("index");
    let region = payload_region(&header, records.len(), data.len());
    for record in &records {
        assert!(
            region.contains(&(record.offset as u64)),
            "offset {:#x} of {:#010x} outside {:?}",
            record.offset,
            record.hash,
            region
        );
    }
}

#[test]
fn legacy_fixture_decodes_in_table_order() {
    let data = legacy_fixture();
    let container =
        Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");

    assert_eq!(container.header, ContainerHeader::legacy());
    assert_eq!(container.entries.len(), 2);

    let first = &container.entries[0];
    assert_eq!(first.hash, 0x2222);
    assert_eq!(first.id, None);
    assert_eq!(first.lines, vec![Line::new(0, 90, "Hello")]);

    let second = &container.entries[1];
    assert_eq!(second.hash, 0x1111);
    assert_eq!(second.flags, 7);
    assert_eq!(
        second.lines,
        vec![Line::new(10, 20, "ab"), Line::new(30, 40, "")]
    );
}

#[test]
fn unsorted_container_round_trips_byte_for_byte() {
    let data = legacy_fixture();
    let mut container =
        Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");
    let written = container.to_bytes(&default_policy()).expect("write");
    assert_eq!(written, data, "rewritten container differs from the original");
}

#[test]
fn resolved_identifiers_keep_the_round_trip_exact() {
    let hello = str_code32(b"HELLO");
    let mut original = Container::new(ContainerHeader::extended(SortOrder::Unsorted, 1, 4));
    original.entries.push(entry(hello, "Hello there"));
    original.entries.push(entry(0xDEAD_BEEF, "Unknown speaker"));
    let data = original.to_bytes(&default_policy()).expect("write");

    let dictionary = HashDictionary::from_lines(["HELLO"]);
    let mut reread = Container::from_bytes(&data, &default_policy(), &dictionary).expect("read");
    assert_eq!(reread.entries[0].id.as_deref(), Some("HELLO"));
    assert_eq!(reread.entries[1].id, None, "unknown hash must stay hash-only");

    let rewritten = reread.to_bytes(&default_policy()).expect("rewrite");
    assert_eq!(rewritten, data);
}

#[test]
fn ascending_policy_sorts_the_index_table() {
    let mut container = Container::new(ContainerHeader::extended(SortOrder::Ascending, 1, 0));
    container.entries.push(entry(30, "thirty"));
    container.entries.push(entry(10, "ten"));
    container.entries.push(entry(20, "twenty"));

    let data = container.to_bytes(&default_policy()).expect("write");
    let (_, records) = read_index(&data).expect("index");
    let hashes: Vec<u32> = records.iter().map(|r| r.hash).collect();
    assert_eq!(hashes, vec![10, 20, 30]);
    assert!(
        records.windows(2).all(|w| w[0].offset < w[1].offset),
        "payload must be laid out in index order"
    );

    let reread = Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");
    let texts: Vec<String> = reread.entries.iter().map(Entry::text).collect();
    assert_eq!(texts, vec!["ten", "twenty", "thirty"]);
}

#[test]
fn ascending_policy_sorts_by_identifier_hash() {
    let ids = ["intro_line", "boss_taunt", "ending_credits"];
    let mut container = Container::new(ContainerHeader::extended(SortOrder::LocalizedAscending, 1, 0));
    for id in ids {
        let mut e = Entry::with_id(id);
        e.push_line(Line::new(0, 1, id));
        container.entries.push(e);
    }

    let data = container.to_bytes(&default_policy()).expect("write");
    let (_, records) = read_index(&data).expect("index");

    let mut expected: Vec<u32> = ids.iter().map(|id| str_code32(id.as_bytes())).collect();
    expected.sort_unstable();
    let actual: Vec<u32> = records.iter().map(|r| r.hash).collect();
    assert_eq!(actual, expected);
}

#[test]
fn ascending_sort_is_stable_for_equal_hashes() {
    let mut container = Container::new(ContainerHeader::extended(SortOrder::Ascending, 1, 0));
    container.entries.push(entry(5, "first"));
    container.entries.push(entry(1, "lowest"));
    container.entries.push(entry(5, "second"));

    let data = container.to_bytes(&default_policy()).expect("write");
    let reread = Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");
    let texts: Vec<String> = reread.entries.iter().map(Entry::text).collect();
    assert_eq!(texts, vec!["lowest", "first", "second"]);
}

#[test]
fn ascending_round_trip_preserves_the_entry_set() {
    let mut container = Container::new(ContainerHeader::extended(SortOrder::Ascending, 1, 0));
    for (hash, text) in [(900, "c"), (100, "a"), (500, "b")] {
        container.entries.push(entry(hash, text));
    }
    // Unsorted on disk, flagged ascending in the header.
    let mut unsorted = container.clone();
    unsorted.header.sort = SortOrder::Unsorted;
    let mut data = unsorted.to_bytes(&default_policy()).expect("write");
    data[1] = subp_tool::subp::format::header::pack_control(&container.header);

    let dictionary = HashDictionary::new();
    let first = Container::from_bytes(&data, &default_policy(), &dictionary).expect("read");
    let mut rewritten = first.clone();
    let second_bytes = rewritten.to_bytes(&default_policy()).expect("rewrite");
    let second = Container::from_bytes(&second_bytes, &default_policy(), &dictionary).expect("reread");

    let mut a = first.entries.clone();
    let mut b = second.entries.clone();
    a.sort_by_key(|e| e.hash);
    b.sort_by_key(|e| e.hash);
    assert_eq!(a, b, "entry set changed across the ascending round trip");
    assert_eq!(
        second.entries.iter().map(|e| e.hash).collect::<Vec<_>>(),
        vec![100, 500, 900]
    );
}

#[test]
fn written_offsets_stay_inside_the_payload_region() {
    for header in [
        ContainerHeader::legacy(),
        ContainerHeader::extended(SortOrder::Ascending, 7, 2),
    ] {
        let mut container = Container::new(header);
        for i in 0..40u32 {
            container.entries.push(entry(i.wrapping_mul(0x9E37_79B9), &"x".repeat(i as usize)));
        }
        container.entries.push(Entry::with_hash(0xFFFF_FFFF));
        let data = container.to_bytes(&default_policy()).expect("write");
        assert_offsets_in_payload(&data);
    }
    assert_offsets_in_payload(&legacy_fixture());
}

#[test]
fn header_language_overrides_single_byte_request() {
    let text = "字幕のテスト";
    let mut container = Container::new(ContainerHeader::extended(
        SortOrder::Localized,
        Language::Japanese.id(),
        0,
    ));
    container.entries.push(entry(0x1234, text));

    let requested = EncodingPolicy::new(Some(WINDOWS_1252));
    assert_eq!(container.encoding(&requested), UTF_8);
    let data = container.to_bytes(&requested).expect("write as UTF-8 despite request");
    assert!(
        data.windows(text.len()).any(|w| w == text.as_bytes()),
        "payload should hold the UTF-8 bytes of the text"
    );

    let reread = Container::from_bytes(&data, &requested, &HashDictionary::new()).expect("read");
    assert_eq!(reread.entries[0].text(), text);
}

#[test]
fn caller_encoding_applies_when_header_is_not_authoritative() {
    let mut container = Container::new(ContainerHeader::extended(
        SortOrder::Unsorted,
        Language::Japanese.id(),
        0,
    ));
    container.entries.push(entry(0x1234, "字幕"));

    let requested = EncodingPolicy::new(Some(WINDOWS_1252));
    match container.to_bytes(&requested) {
        Err(SubpError::Encode { hash, encoding }) => {
            assert_eq!(hash, 0x1234);
            assert_eq!(encoding, "windows-1252");
        }
        other => panic!("expected an encode error, got {:?}", other),
    }
}

#[test]
fn cyrillic_text_uses_the_single_byte_table() {
    let mut container = Container::new(ContainerHeader::extended(
        SortOrder::Localized,
        Language::Russian.id(),
        0,
    ));
    container.entries.push(entry(1, "Привет"));
    let data = container.to_bytes(&default_policy()).expect("write");
    // Six letters, one byte each.
    assert!(data.ends_with(&[0xBF, 0xE0, 0xD8, 0xD2, 0xD5, 0xE2]));
    let reread = Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");
    assert_eq!(reread.entries[0].text(), "Привет");
}

#[test]
fn wrong_format_tag_is_rejected() {
    let mut data = legacy_fixture();
    data[0] = 0x12;
    let result = Container::from_bytes(&data, &default_policy(), &HashDictionary::new());
    assert!(matches!(result, Err(SubpError::InvalidMagic { found: 0x12, .. })));
}

#[test]
fn entry_count_beyond_stream_is_rejected() {
    let mut data = vec![0x13, 0x01, 0x05, 0x00];
    data.extend_from_slice(&[0u8; 8]);
    match Container::from_bytes(&data, &default_policy(), &HashDictionary::new()) {
        Err(SubpError::CountMismatch {
            count,
            required,
            available,
        }) => {
            assert_eq!(count, 5);
            assert_eq!(required, 40);
            assert_eq!(available, 8);
        }
        other => panic!("expected CountMismatch, got {:?}", other),
    }
}

#[test]
fn offsets_outside_the_payload_are_fatal() {
    for bad_offset in [4u32, 11, 100] {
        let mut data = vec![0x13, 0x01, 0x01, 0x00];
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&bad_offset.to_le_bytes());
        data.extend_from_slice(&[0x00, 0x00]);
        match Container::from_bytes(&data, &default_policy(), &HashDictionary::new()) {
            Err(SubpError::OffsetOutOfBounds {
                hash,
                offset,
                start,
                end,
            }) => {
                assert_eq!(hash, 7);
                assert_eq!(offset, bad_offset);
                assert_eq!((start, end), (12, 14));
            }
            other => panic!("offset {} should be rejected, got {:?}", bad_offset, other),
        }
    }
}

#[test]
fn payload_running_past_the_end_is_truncated() {
    let mut data = vec![0x13, 0x01, 0x01, 0x00];
    data.extend_from_slice(&7u32.to_le_bytes());
    data.extend_from_slice(&12u32.to_le_bytes());
    // One line announced, text length 50, only 3 bytes present.
    data.extend_from_slice(&[0x01, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&50u16.to_le_bytes());
    data.extend_from_slice(b"abc");

    let result = Container::from_bytes(&data, &default_policy(), &HashDictionary::new());
    assert!(
        matches!(result, Err(SubpError::Truncated { context: "entry payload", .. })),
        "got {:?}",
        result
    );
}

#[test]
fn invalid_utf8_is_an_encoding_error() {
    let mut data = vec![0x13, 0x82, Language::Japanese.id(), 0x00, 0x01, 0x00];
    data.extend_from_slice(&9u32.to_le_bytes());
    data.extend_from_slice(&14u32.to_le_bytes());
    data.extend_from_slice(&[0x01, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&[0xFF, 0xFE]);

    let result = Container::from_bytes(&data, &default_policy(), &HashDictionary::new());
    match result {
        Err(SubpError::Decode { hash, encoding }) => {
            assert_eq!(hash, 9);
            assert_eq!(encoding, "UTF-8");
        }
        other => panic!("expected a decode error, got {:?}", other),
    }
}

#[test]
fn edited_identifier_wins_over_stale_hash() {
    let mut stale = Entry::with_id("RENAMED_LINE");
    stale.hash = 42;
    stale.push_line(Line::new(0, 1, "text"));
    let mut container = Container::new(ContainerHeader::legacy());
    container.entries.push(stale);

    let data = container.to_bytes(&default_policy()).expect("write");
    let (_, records) = read_index(&data).expect("index");
    assert_eq!(records[0].hash, str_code32(b"RENAMED_LINE"));
}

#[test]
fn too_many_entries_cannot_be_written() {
    let mut container = Container::new(ContainerHeader::legacy());
    container.entries = (0..=u16::MAX as u32 + 1).map(Entry::with_hash).collect();
    let result = container.to_bytes(&default_policy());
    assert!(matches!(result, Err(SubpError::TooManyEntries(65537))));
}

#[test]
fn empty_container_is_just_a_header() {
    let mut container = Container::new(ContainerHeader::legacy());
    let data = container.to_bytes(&default_policy()).expect("write");
    assert_eq!(data, vec![0x13, 0x01, 0x00, 0x00]);
    let reread = Container::from_bytes(&data, &default_policy(), &HashDictionary::new()).expect("read");
    assert!(reread.entries.is_empty());
}

#[test]
fn encoders_that_fall_back_to_utf8_are_refused() {
    let mut container = Container::new(ContainerHeader::legacy());
    container.entries.push(entry(3, "Hi"));
    let policy = EncodingPolicy::new(Some(encoding_rs::UTF_16LE));
    assert!(matches!(
        container.to_bytes(&policy),
        Err(SubpError::Encode { hash: 3, encoding: "UTF-16LE" })
    ));
}

#[test]
fn western_text_uses_windows_1252_rather_than_latin1() {
    let policy = EncodingPolicy::new(Some(WINDOWS_1252));

    // 0x80 is the euro sign, not the C1 control U+0080.
    let mut data = vec![0x13, 0x01, 0x01, 0x00];
    data.extend_from_slice(&5u32.to_le_bytes());
    data.extend_from_slice(&12u32.to_le_bytes());
    data.extend_from_slice(&[0x01, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&[0x80, 0xE9]);
    let mut container = Container::from_bytes(&data, &policy, &HashDictionary::new()).expect("read");
    assert_eq!(container.entries[0].text(), "€é");
    assert_eq!(container.to_bytes(&policy).expect("rewrite"), data);

    // C1 controls that windows-1252 maps to printable characters cannot be packed.
    for control in ['\u{80}', '\u{8A}', '\u{9F}'] {
        let mut c1 = Container::new(ContainerHeader::legacy());
        c1.entries.push(entry(6, &control.to_string()));
        assert!(
            matches!(c1.to_bytes(&policy), Err(SubpError::Encode { hash: 6, .. })),
            "U+{:04X} should not encode",
            control as u32
        );
    }

    // The five unmapped positions still pass through.
    let mut passthrough = Container::new(ContainerHeader::legacy());
    passthrough.entries.push(entry(7, "\u{81}\u{8D}\u{8F}\u{90}\u{9D}"));
    let bytes = passthrough.to_bytes(&policy).expect("unmapped C1 bytes encode");
    assert!(bytes.ends_with(&[0x81, 0x8D, 0x8F, 0x90, 0x9D]));
}
