mod common;

use bookmeta::mobi::{Compression, Encoding, Encryption, ExthTag, MobiContainer};
use bookmeta::{Ebook, Error, Format, ReadOptions};
use common::{JPEG, MobiBuilder, NULL_INDEX, record0_offset};
use proptest::prelude::*;
use tempfile::Builder;

fn jane_doe() -> MobiBuilder {
    MobiBuilder {
        compression: 1,
        text_length: 100,
        text_record_count: 1,
        text_record_size: 100,
        header_length: 232,
        exth_flags: 0x40,
        ..MobiBuilder::new()
    }
    .exth_record(100, "Jane Doe")
}

#[test]
fn test_single_author_file() {
    let container = MobiContainer::parse(jane_doe().build()).unwrap();

    let palmdoc = container.palmdoc_header();
    assert_eq!(palmdoc.compression, Compression::None);
    assert_eq!(palmdoc.text_length, 100);
    assert_eq!(palmdoc.text_record_count, 1);
    assert_eq!(palmdoc.text_record_size, 100);
    assert_eq!(palmdoc.encryption, Encryption::None);

    let mobi = container.mobi_header();
    assert_eq!(mobi.header_length, 232);
    assert!(mobi.has_exth());
    assert_eq!(mobi.encoding, Encoding::Utf8);
    assert_eq!(mobi.full_name, "Test Book");

    let meta = container.metadata();
    assert_eq!(meta.authors(), vec!["Jane Doe"]);
    assert_eq!(meta.publisher(), None);
    assert!(container.exth_error().is_none());
}

#[test]
fn test_single_author_normalized() {
    let book = Ebook::from_bytes(jane_doe().build()).unwrap();
    assert_eq!(book.format, Format::Mobi);
    assert!(book.has_parser);
    assert_eq!(book.title.as_deref(), Some("Test Book"));
    assert_eq!(book.authors.len(), 1);
    assert_eq!(book.authors[0].name, "Jane Doe");
    assert_eq!(book.authors[0].role.as_deref(), Some("aut"));
    assert_eq!(book.publisher, None);
}

#[test]
fn test_wrong_magic_is_not_mobi() {
    let mut data = jane_doe().build();
    let magic = record0_offset(&data) + 16;
    data[magic..magic + 4].copy_from_slice(b"XXXX");

    let err = MobiContainer::parse(data).unwrap_err();
    assert!(matches!(err, Error::NotMobiFormat(_)), "{err:?}");
}

#[test]
fn test_short_exth_record_only_drops_exth() {
    let mut data = jane_doe().build();
    // first EXTH record length field: record0 + PalmDOC + MOBI + EXTH header + tag
    let length_field = record0_offset(&data) + 16 + 232 + 12 + 4;
    data[length_field..length_field + 4].copy_from_slice(&5u32.to_be_bytes());

    let container = MobiContainer::parse(data).unwrap();
    assert!(container.exth_header().is_none());
    assert!(matches!(
        container.exth_error(),
        Some(Error::MalformedExthRecord(_))
    ));
    assert_eq!(container.mobi_header().header_length, 232);
    assert_eq!(container.palmdoc_header().text_length, 100);
    assert!(container.metadata().authors().is_empty());
}

#[test]
fn test_headers_reencode_exactly() {
    let builder = MobiBuilder::new()
        .exth_record(100, "Lewis Carroll")
        .exth_record(503, "Alice")
        .exth_record(201, 0u32.to_be_bytes());
    let record0 = builder.record0();
    let container = MobiContainer::parse(builder.build()).unwrap();

    assert_eq!(container.record0(), record0.as_slice());
    assert_eq!(container.palmdoc_header().to_bytes(), record0[..16]);
    assert_eq!(container.mobi_header().to_bytes(), record0[16..16 + 232]);

    let exth = container.exth_header().unwrap();
    let exth_len = exth.header_length as usize;
    assert_eq!(exth.to_bytes(), record0[248..248 + exth_len]);
}

#[test]
fn test_kf8_header_extension_reencodes() {
    let builder = MobiBuilder {
        header_length: 264,
        file_version: 8,
        ..MobiBuilder::new()
    };
    let record0 = builder.record0();
    let container = MobiContainer::parse(builder.build()).unwrap();
    let mobi = container.mobi_header();
    assert!(mobi.is_kf8());
    assert_eq!(mobi.extension.len(), 32);
    assert_eq!(mobi.to_bytes(), record0[16..16 + 264]);
}

#[test]
fn test_short_mobi_header_leaves_later_fields_zero() {
    let builder = MobiBuilder {
        header_length: 128,
        ..MobiBuilder::new().without_exth()
    };
    let container = MobiContainer::parse(builder.build()).unwrap();
    let mobi = container.mobi_header();
    assert_eq!(mobi.header_length, 128);
    assert_eq!(mobi.exth_flags, 0);
    assert_eq!(mobi.indx_record, 0);
    assert_eq!(mobi.drm_offset, 0);
}

#[test]
fn test_repeatable_fields_keep_order() {
    let builder = MobiBuilder::new()
        .exth_record(100, "First")
        .exth_record(104, "9780000000001")
        .exth_record(100, "Second")
        .exth_record(101, "Publisher")
        .exth_record(100, "Third")
        .exth_record(104, "9780000000002");
    let container = MobiContainer::parse(builder.build()).unwrap();
    let meta = container.metadata();
    assert_eq!(meta.authors(), vec!["First", "Second", "Third"]);
    assert_eq!(meta.isbns(), vec!["9780000000001", "9780000000002"]);
    assert_eq!(container.exth_header().unwrap().record_count(), 6);

    let book = bookmeta::mobi::to_ebook(&container, &ReadOptions::default());
    let names: Vec<&str> = book.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
    assert_eq!(book.isbn(), Some("9780000000001"));
}

#[test]
fn test_absent_exth() {
    let container = MobiContainer::parse(MobiBuilder::new().without_exth().build()).unwrap();
    assert!(!container.mobi_header().has_exth());
    assert!(container.exth_header().is_none());
    assert!(container.exth_error().is_none());

    let meta = container.metadata();
    assert!(!meta.has_exth());
    assert!(meta.authors().is_empty());
    for &tag in ExthTag::ALL {
        assert!(meta.binary(tag).is_none(), "{}", tag.name());
    }
    // the header title still applies
    assert_eq!(meta.title().as_deref(), Some("Test Book"));
}

#[test]
fn test_exth_flag_without_block() {
    let builder = MobiBuilder {
        exth: None,
        exth_flags: 0x40,
        ..MobiBuilder::new()
    };
    let container = MobiContainer::parse(builder.build()).unwrap();
    assert!(container.exth_header().is_none());
    assert!(container.exth_error().is_none());
}

#[test]
fn test_cover_extraction() {
    let builder = MobiBuilder {
        first_image_index: 2,
        records: vec![vec![b'x'; 100], JPEG.to_vec(), b"FLIS\0\0\0\x08".to_vec()],
        ..MobiBuilder::new()
    }
    .exth_record(201, 0u32.to_be_bytes())
    .exth_record(202, 1u32.to_be_bytes());
    let data = builder.build();

    let container = MobiContainer::parse(data.clone()).unwrap();
    assert_eq!(container.metadata().cover_record(), Some(2));
    let (cover, media_type) = container.cover().unwrap();
    assert_eq!(cover, JPEG);
    assert_eq!(media_type, "image/jpeg");
    // thumbnail points at a non-image record
    assert!(container.thumbnail().is_none());

    let book = Ebook::from_bytes(data.clone()).unwrap();
    let cover = book.cover.unwrap();
    assert_eq!(cover.media_type, "image/jpeg");
    assert_eq!(cover.data, JPEG);

    let book = Ebook::from_bytes_with(data, &ReadOptions::without_cover()).unwrap();
    assert!(book.cover.is_none());
}

#[test]
fn test_null_cover_offset() {
    let builder = MobiBuilder {
        first_image_index: 2,
        records: vec![vec![b'x'; 100], JPEG.to_vec()],
        ..MobiBuilder::new()
    }
    .exth_record(201, NULL_INDEX.to_be_bytes());
    let container = MobiContainer::parse(builder.build()).unwrap();
    assert_eq!(container.metadata().cover_record(), None);
    assert!(container.cover().is_none());
}

#[test]
fn test_record_access() {
    let builder = MobiBuilder {
        records: vec![b"first".to_vec(), b"second".to_vec(), Vec::new()],
        ..MobiBuilder::new()
    };
    let container = MobiContainer::parse(builder.build()).unwrap();
    assert_eq!(container.record_count(), 4);
    assert_eq!(container.record(1).unwrap(), b"first");
    assert_eq!(container.record(2).unwrap(), b"second");
    assert_eq!(container.record(3).unwrap(), b"");
    assert!(matches!(
        container.record(4),
        Err(Error::IndexOutOfRange { index: 4, count: 4 })
    ));
}

#[test]
fn test_decreasing_offsets_rejected() {
    let builder = MobiBuilder {
        records: vec![b"first".to_vec(), b"second".to_vec()],
        ..MobiBuilder::new()
    };
    let mut data = builder.build();
    // swap the offsets of records 1 and 2
    let (a, b) = (78 + 8, 78 + 16);
    let first: [u8; 4] = data[a..a + 4].try_into().unwrap();
    let second: [u8; 4] = data[b..b + 4].try_into().unwrap();
    data[a..a + 4].copy_from_slice(&second);
    data[b..b + 4].copy_from_slice(&first);

    let err = MobiContainer::parse(data).unwrap_err();
    assert!(matches!(err, Error::MalformedRecordTable(_)), "{err:?}");
}

#[test]
fn test_zero_length_record_rejected() {
    let builder = MobiBuilder {
        records: vec![b"first".to_vec(), b"second".to_vec()],
        ..MobiBuilder::new()
    };
    let mut data = builder.build();
    // record 2 starts where record 1 does
    let (a, b) = (78 + 8, 78 + 16);
    let first: [u8; 4] = data[a..a + 4].try_into().unwrap();
    data[b..b + 4].copy_from_slice(&first);

    let err = MobiContainer::parse(data).unwrap_err();
    assert!(matches!(err, Error::MalformedRecordTable(_)), "{err:?}");
}

#[test]
fn test_truncated_table_rejected() {
    let data = jane_doe().build();
    let err = MobiContainer::parse(data[..90].to_vec()).unwrap_err();
    assert!(matches!(err, Error::MalformedRecordTable(_)), "{err:?}");
}

#[test]
fn test_cp1252_title_and_author() {
    let builder = MobiBuilder {
        encoding: 1252,
        full_name: b"Caf\xe9 Stories".to_vec(),
        ..MobiBuilder::new()
    }
    .exth_record(100, b"Ren\xe9e".to_vec());
    let container = MobiContainer::parse(builder.build()).unwrap();
    assert_eq!(container.mobi_header().encoding, Encoding::Cp1252);
    assert_eq!(container.mobi_header().full_name, "Café Stories");
    assert_eq!(container.metadata().authors(), vec!["Renée"]);
}

#[test]
fn test_full_metadata_normalization() {
    let builder = MobiBuilder::new()
        .exth_record(100, "Lewis Carroll")
        .exth_record(100, "Tim Burton")
        .exth_record(101, "Macmillan")
        .exth_record(103, "Down the rabbit hole.")
        .exth_record(104, "9780000000001")
        .exth_record(105, "Fantasy; Classics")
        .exth_record(106, "1865-11-26")
        .exth_record(108, "calibre (5.0.0) [https://calibre-ebook.com]")
        .exth_record(109, "Public domain")
        .exth_record(112, "calibre:0b1c2d3e-0000-4000-8000-000000000000")
        .exth_record(113, "B000TEST01")
        .exth_record(503, "Alice's Adventures in Wonderland")
        .exth_record(524, "en")
        .exth_record(524, "fr")
        .exth_record(9999, vec![0xAB, 0xCD]);
    let book = Ebook::from_bytes(builder.build()).unwrap();

    assert_eq!(book.title.as_deref(), Some("Alice's Adventures in Wonderland"));
    let names: Vec<&str> = book.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Lewis Carroll", "Tim Burton"]);
    assert_eq!(book.publisher.as_deref(), Some("Macmillan"));
    assert_eq!(book.description.as_deref(), Some("Down the rabbit hole."));
    assert_eq!(book.tags, vec!["Fantasy", "Classics"]);
    assert_eq!(book.copyright.as_deref(), Some("Public domain"));
    assert_eq!(book.language.as_deref(), Some("en"));
    assert_eq!(book.extras["languages"], "fr");
    assert_eq!(
        book.publish_date.map(|d| d.format("%Y-%m-%d").to_string()).as_deref(),
        Some("1865-11-26")
    );
    assert_eq!(book.isbn(), Some("9780000000001"));
    assert_eq!(book.identifier("asin"), Some("B000TEST01"));
    assert_eq!(book.identifier("uuid"), Some("0b1c2d3e-0000-4000-8000-000000000000"));
    assert!(book.extras["producer"].starts_with("calibre"));
    assert_eq!(book.extras["exth_9999"], "abcd");
    assert_eq!(book.extras["mobi_version"], "6");
}

#[test]
fn test_pdb_name_used_without_title() {
    let builder = MobiBuilder {
        pdb_name: "Alice_in_Wonderland".to_string(),
        full_name: Vec::new(),
        ..MobiBuilder::new()
    };
    let book = Ebook::from_bytes(builder.build()).unwrap();
    assert_eq!(book.title.as_deref(), Some("Alice in Wonderland"));
}

#[test]
fn test_read_from_path() {
    let mut file = Builder::new().suffix(".azw3").tempfile().unwrap();
    std::io::Write::write_all(&mut file, &jane_doe().build()).unwrap();

    let book = Ebook::read(file.path()).unwrap();
    assert_eq!(book.format, Format::Azw3);
    assert_eq!(book.path.as_deref(), Some(file.path()));
    assert_eq!(book.authors[0].name, "Jane Doe");

    let book = bookmeta::read_mobi(file.path()).unwrap();
    assert_eq!(book.format, Format::Mobi);
}

proptest! {
    #[test]
    fn prop_record_spans_tile_the_file(
        sizes in prop::collection::vec(1usize..64, 1..12)
    ) {
        let records: Vec<Vec<u8>> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| vec![i as u8; n])
            .collect();
        let builder = MobiBuilder { records: records.clone(), ..MobiBuilder::new() };
        let data = builder.build();
        let file_len = data.len();
        let container = MobiContainer::parse(data).unwrap();

        let table = container.record_table();
        prop_assert_eq!(table.len(), records.len() + 1);
        for w in table.records().windows(2) {
            prop_assert!(w[0].offset < w[1].offset);
        }
        let mut end = table.record_span(0).unwrap().0;
        for i in 0..table.len() {
            let (start, stop) = table.record_span(i).unwrap();
            prop_assert_eq!(start, end);
            end = stop;
        }
        prop_assert_eq!(end, file_len);
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(container.record(i + 1).unwrap(), record.as_slice());
        }
    }

    #[test]
    fn prop_exth_records_round_trip_in_order(
        entries in prop::collection::vec(
            (100u32..110, prop::collection::vec(any::<u8>(), 0..24)),
            0..16
        )
    ) {
        let mut builder = MobiBuilder::new();
        for (tag, value) in &entries {
            builder = builder.exth_record(*tag, value.clone());
        }
        let record0 = builder.record0();
        let container = MobiContainer::parse(builder.build()).unwrap();
        let exth = container.exth_header().unwrap();

        prop_assert_eq!(exth.records.len(), entries.len());
        for (record, (tag, value)) in exth.records.iter().zip(&entries) {
            prop_assert_eq!(record.tag, *tag);
            prop_assert_eq!(&record.value, value);
            prop_assert!(record.len() >= 8);
        }
        let len = exth.header_length as usize;
        prop_assert_eq!(exth.to_bytes(), &record0[248..248 + len]);
    }
}
