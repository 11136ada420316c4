//! Synthetic fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const NULL_INDEX: u32 = 0xFFFF_FFFF;
pub const MOBI_HEADER_LEN: u32 = 232;

/// A minimal JPEG: SOI marker and a JFIF APP0 header.
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00\xFF\xD9";

/// Builds a MOBI file byte by byte.
#[derive(Debug, Clone)]
pub struct MobiBuilder {
    pub pdb_name: String,
    pub compression: u16,
    pub text_length: u32,
    pub text_record_count: u16,
    pub text_record_size: u16,
    pub encryption: u16,
    pub header_length: u32,
    pub encoding: u32,
    pub file_version: u32,
    pub full_name: Vec<u8>,
    pub first_image_index: u32,
    pub exth_flags: u32,
    pub exth: Option<Vec<(u32, Vec<u8>)>>,
    /// Records after record 0.
    pub records: Vec<Vec<u8>>,
}

impl Default for MobiBuilder {
    fn default() -> Self {
        Self {
            pdb_name: "Test_Book".to_string(),
            compression: 1,
            text_length: 100,
            text_record_count: 1,
            text_record_size: 100,
            encryption: 0,
            header_length: MOBI_HEADER_LEN,
            encoding: 65001,
            file_version: 6,
            full_name: b"Test Book".to_vec(),
            first_image_index: NULL_INDEX,
            exth_flags: 0x50,
            exth: Some(Vec::new()),
            records: vec![vec![b'x'; 100]],
        }
    }
}

impl MobiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exth_record(mut self, tag: u32, value: impl Into<Vec<u8>>) -> Self {
        self.exth.get_or_insert_with(Vec::new).push((tag, value.into()));
        self
    }

    pub fn without_exth(mut self) -> Self {
        self.exth = None;
        self.exth_flags = 0;
        self
    }

    pub fn exth_bytes(&self) -> Vec<u8> {
        let Some(records) = &self.exth else {
            return Vec::new();
        };
        let body: usize = records.iter().map(|(_, v)| 8 + v.len()).sum();
        let mut out = Vec::new();
        out.extend_from_slice(b"EXTH");
        out.extend_from_slice(&((12 + body) as u32).to_be_bytes());
        out.extend_from_slice(&(records.len() as u32).to_be_bytes());
        for (tag, value) in records {
            out.extend_from_slice(&tag.to_be_bytes());
            out.extend_from_slice(&((8 + value.len()) as u32).to_be_bytes());
            out.extend_from_slice(value);
        }
        out
    }

    pub fn record0(&self) -> Vec<u8> {
        let mut r = Vec::new();
        r.extend_from_slice(&self.compression.to_be_bytes());
        r.extend_from_slice(&0u16.to_be_bytes());
        r.extend_from_slice(&self.text_length.to_be_bytes());
        r.extend_from_slice(&self.text_record_count.to_be_bytes());
        r.extend_from_slice(&self.text_record_size.to_be_bytes());
        r.extend_from_slice(&self.encryption.to_be_bytes());
        r.extend_from_slice(&0u16.to_be_bytes());

        let exth = self.exth_bytes();
        let name_offset = 16 + self.header_length as usize + exth.len();

        let mut mobi = vec![0u8; self.header_length as usize];
        let mut put = |offset: usize, value: u32| {
            if offset + 4 <= mobi.len() {
                mobi[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
            }
        };
        put(4, self.header_length);
        put(8, 2);
        put(12, self.encoding);
        put(16, 0x1234_5678);
        put(20, self.file_version);
        for offset in (24..64).step_by(4) {
            put(offset, NULL_INDEX);
        }
        put(64, 1 + self.text_record_count as u32);
        put(76, 9);
        put(88, self.file_version);
        put(92, self.first_image_index);
        put(112, self.exth_flags);
        put(152, NULL_INDEX);
        put(228, NULL_INDEX);

        put(68, name_offset as u32);
        put(72, self.full_name.len() as u32);
        mobi[0..4].copy_from_slice(b"MOBI");

        r.extend_from_slice(&mobi);
        r.extend_from_slice(&exth);
        r.extend_from_slice(&self.full_name);
        r.extend_from_slice(&[0, 0]);
        while r.len() % 4 != 0 {
            r.push(0);
        }
        r
    }

    pub fn build(&self) -> Vec<u8> {
        let mut records = vec![self.record0()];
        records.extend(self.records.iter().cloned());
        pdb(&self.pdb_name, &records)
    }
}

/// Wrap records in a PDB envelope of type `BOOKMOBI`.
pub fn pdb(name: &str, records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0u8; 78];
    let name = name.as_bytes();
    let n = name.len().min(31);
    out[..n].copy_from_slice(&name[..n]);
    out[36..40].copy_from_slice(&0x5000_0000u32.to_be_bytes());
    out[40..44].copy_from_slice(&0x5000_0000u32.to_be_bytes());
    out[60..68].copy_from_slice(b"BOOKMOBI");
    out[68..72].copy_from_slice(&(2 * records.len() as u32).to_be_bytes());
    out[76..78].copy_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = 78 + 8 * records.len() + 2;
    for (i, record) in records.iter().enumerate() {
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        let uid = 2 * i as u32;
        out.push(0);
        out.extend_from_slice(&uid.to_be_bytes()[1..]);
        offset += record.len();
    }
    out.extend_from_slice(&[0, 0]);
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

/// Absolute offset of record 0, read from the record table.
pub fn record0_offset(data: &[u8]) -> usize {
    u32::from_be_bytes([data[78], data[79], data[80], data[81]]) as usize
}

/// Build a zip archive from `(name, bytes)` entries, stored uncompressed.
pub fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub const CONTAINER_XML: &[u8] = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const ALICE_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uuid_id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Alice's Adventures in Wonderland</dc:title>
    <dc:creator opf:role="aut" opf:file-as="Carroll, Lewis">Lewis Carroll</dc:creator>
    <dc:contributor opf:role="bkp">calibre (5.0.0) [https://calibre-ebook.com]</dc:contributor>
    <dc:identifier opf:scheme="ISBN">9780000000001</dc:identifier>
    <dc:identifier id="uuid_id" opf:scheme="uuid">0b1c2d3e-0000-4000-8000-000000000000</dc:identifier>
    <dc:language>en</dc:language>
    <dc:publisher>Macmillan</dc:publisher>
    <dc:subject>Fantasy</dc:subject>
    <dc:date>1865-11-26T00:00:00+00:00</dc:date>
    <meta name="calibre:series" content="Alice"/>
    <meta name="calibre:series_index" content="1"/>
    <meta name="cover" content="cover"/>
  </metadata>
  <manifest>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#;

/// A complete EPUB holding [`ALICE_OPF`] and its cover.
pub fn alice_epub() -> Vec<u8> {
    zip(&[
        ("mimetype", b"application/epub+zip".as_slice()),
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", ALICE_OPF.as_bytes()),
        ("OEBPS/images/cover.jpg", JPEG),
        ("OEBPS/ch1.xhtml", b"<html/>".as_slice()),
    ])
}

pub const COMIC_INFO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ComicInfo>
  <Title>Down the Rabbit Hole</Title>
  <Series>Alice</Series>
  <Number>1</Number>
  <Writer>Lewis Carroll</Writer>
  <Penciller>John Tenniel</Penciller>
  <Publisher>Macmillan</Publisher>
  <Year>1865</Year>
  <LanguageISO>en</LanguageISO>
</ComicInfo>"#;

pub fn alice_cbz() -> Vec<u8> {
    zip(&[
        ("page002.jpg", JPEG),
        ("page001.jpg", JPEG),
        ("ComicInfo.xml", COMIC_INFO.as_bytes()),
    ])
}
