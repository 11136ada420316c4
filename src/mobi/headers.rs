//! PalmDOC and MOBI headers at the start of record 0.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::util::decode_text;

use super::cursor::{ByteCursor, trim_nul};

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// Length of the PalmDOC header; the MOBI header starts right after it.
pub const PALMDOC_HEADER_LEN: usize = 16;

/// Length of the MOBI header layout with named fields. Longer headers (KF8)
/// keep the remainder in [`MobiHeader::extension`].
pub const MOBI_LAYOUT_LEN: usize = 232;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

impl Compression {
    fn from_code(code: u16) -> Self {
        match code {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::PalmDoc => 2,
            Compression::Huffman => 0x4448,
            Compression::Unknown(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None,
    OldMobi,
    Mobi,
    Unknown(u16),
}

impl Encryption {
    fn from_code(code: u16) -> Self {
        match code {
            0 => Encryption::None,
            1 => Encryption::OldMobi,
            2 => Encryption::Mobi,
            n => Encryption::Unknown(n),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Encryption::None => 0,
            Encryption::OldMobi => 1,
            Encryption::Mobi => 2,
            Encryption::Unknown(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl Encoding {
    fn from_code(code: u32) -> Self {
        match code {
            1252 => Encoding::Cp1252,
            65001 => Encoding::Utf8,
            n => Encoding::Unknown(n),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Encoding::Cp1252 => 1252,
            Encoding::Utf8 => 65001,
            Encoding::Unknown(n) => n,
        }
    }

    /// Decode text declared in this encoding. Malformed input is replaced,
    /// never rejected.
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            Encoding::Cp1252 => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0,
            Encoding::Unknown(_) => decode_text(bytes, None),
        }
    }
}

/// PalmDOC header (first 16 bytes of record 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalmDocHeader {
    pub compression: Compression,
    /// Always zero in practice; kept for exact re-encoding.
    pub reserved: u16,
    /// Uncompressed length of the book text.
    pub text_length: u32,
    pub text_record_count: u16,
    /// Maximum uncompressed size of a text record, normally 4096.
    pub text_record_size: u16,
    pub encryption: Encryption,
    pub unknown: u16,
}

impl PalmDocHeader {
    pub fn parse(record0: &[u8]) -> Result<Self> {
        let c = ByteCursor::new(record0);
        Ok(Self {
            compression: Compression::from_code(c.u16_at(0)?),
            reserved: c.u16_at(2)?,
            text_length: c.u32_at(4)?,
            text_record_count: c.u16_at(8)?,
            text_record_size: c.u16_at(10)?,
            encryption: Encryption::from_code(c.u16_at(12)?),
            unknown: c.u16_at(14)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PALMDOC_HEADER_LEN);
        out.extend_from_slice(&self.compression.code().to_be_bytes());
        out.extend_from_slice(&self.reserved.to_be_bytes());
        out.extend_from_slice(&self.text_length.to_be_bytes());
        out.extend_from_slice(&self.text_record_count.to_be_bytes());
        out.extend_from_slice(&self.text_record_size.to_be_bytes());
        out.extend_from_slice(&self.encryption.code().to_be_bytes());
        out.extend_from_slice(&self.unknown.to_be_bytes());
        out
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption != Encryption::None
    }
}

/// MOBI header, starting at offset 16 of record 0.
///
/// Offsets in the field comments are relative to the `MOBI` magic. Fields
/// that lie beyond `header_length` are not read and stay zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobiHeader {
    pub header_length: u32,
    /// 2 = book, 3 = PalmDOC book, 0x101.. = news variants.
    pub mobi_type: u32,
    pub encoding: Encoding,
    pub unique_id: u32,
    pub file_version: u32,
    pub orthographic_index: u32,
    pub inflection_index: u32,
    pub index_names: u32,
    pub index_keys: u32,
    pub extra_indices: [u32; 6],
    pub first_non_book_index: u32,
    pub full_name_offset: u32,
    pub full_name_length: u32,
    pub locale: u32,
    pub input_language: u32,
    pub output_language: u32,
    pub min_version: u32,
    pub first_image_index: u32,
    pub huffman_record_offset: u32,
    pub huffman_record_count: u32,
    pub huffman_table_offset: u32,
    pub huffman_table_length: u32,
    /// Bit 6 (0x40) set when an EXTH block follows the header.
    pub exth_flags: u32,
    /// 116..148
    pub reserved_116: [u8; 32],
    pub reserved_148: u32,
    pub drm_offset: u32,
    pub drm_count: u32,
    pub drm_size: u32,
    pub drm_flags: u32,
    /// 168..176
    pub reserved_168: [u8; 8],
    pub first_content_record: u16,
    pub last_content_record: u16,
    pub reserved_180: u32,
    pub fcis_record: u32,
    pub fcis_count: u32,
    pub flis_record: u32,
    pub flis_count: u32,
    /// 200..208
    pub reserved_200: [u8; 8],
    pub reserved_208: u32,
    pub first_compilation_section: u32,
    pub compilation_section_count: u32,
    pub reserved_220: u32,
    pub extra_record_data_flags: u32,
    pub indx_record: u32,
    /// Header bytes past the 232-byte layout (KF8 index fields and padding).
    pub extension: Vec<u8>,
    /// Book title, resolved from `full_name_offset`/`full_name_length`.
    pub full_name: String,
}

/// Reads header fields, treating anything past `limit` as absent.
struct FieldReader<'a> {
    cursor: ByteCursor<'a>,
    limit: usize,
}

impl FieldReader<'_> {
    fn fits(&self, offset: usize, width: usize) -> bool {
        offset + width <= self.limit
    }

    fn u16(&self, offset: usize) -> Result<u16> {
        if self.fits(offset, 2) {
            self.cursor.u16_at(PALMDOC_HEADER_LEN + offset)
        } else {
            Ok(0)
        }
    }

    fn u32(&self, offset: usize) -> Result<u32> {
        if self.fits(offset, 4) {
            self.cursor.u32_at(PALMDOC_HEADER_LEN + offset)
        } else {
            Ok(0)
        }
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        if self.fits(offset, N) {
            out.copy_from_slice(self.cursor.slice(PALMDOC_HEADER_LEN + offset, N)?);
        }
        Ok(out)
    }
}

impl MobiHeader {
    /// Parse the MOBI header from record 0.
    ///
    /// Fails with [`Error::NotMobiFormat`] when the magic is missing or the
    /// header runs past the end of the record.
    pub fn parse(record0: &[u8]) -> Result<Self> {
        let cursor = ByteCursor::new(record0);
        let magic = cursor
            .slice(PALMDOC_HEADER_LEN, 4)
            .map_err(|_| Error::NotMobiFormat("record 0 too short for MOBI header".into()))?;
        if magic != b"MOBI" {
            return Err(Error::NotMobiFormat(format!(
                "expected MOBI magic, found {:?}",
                String::from_utf8_lossy(magic)
            )));
        }

        Self::parse_fields(cursor).map_err(|e| e.in_section(Error::NotMobiFormat))
    }

    fn parse_fields(cursor: ByteCursor<'_>) -> Result<Self> {
        let header_length = cursor.u32_at(PALMDOC_HEADER_LEN + 4)?;
        let f = FieldReader {
            cursor: cursor.clone(),
            limit: header_length as usize,
        };

        let extension = if header_length as usize > MOBI_LAYOUT_LEN {
            cursor
                .slice(
                    PALMDOC_HEADER_LEN + MOBI_LAYOUT_LEN,
                    header_length as usize - MOBI_LAYOUT_LEN,
                )?
                .to_vec()
        } else {
            Vec::new()
        };

        let mut extra_indices = [0u32; 6];
        for (i, slot) in extra_indices.iter_mut().enumerate() {
            *slot = f.u32(40 + i * 4)?;
        }

        let mut header = Self {
            header_length,
            mobi_type: f.u32(8)?,
            encoding: Encoding::from_code(f.u32(12)?),
            unique_id: f.u32(16)?,
            file_version: f.u32(20)?,
            orthographic_index: f.u32(24)?,
            inflection_index: f.u32(28)?,
            index_names: f.u32(32)?,
            index_keys: f.u32(36)?,
            extra_indices,
            first_non_book_index: f.u32(64)?,
            full_name_offset: f.u32(68)?,
            full_name_length: f.u32(72)?,
            locale: f.u32(76)?,
            input_language: f.u32(80)?,
            output_language: f.u32(84)?,
            min_version: f.u32(88)?,
            first_image_index: f.u32(92)?,
            huffman_record_offset: f.u32(96)?,
            huffman_record_count: f.u32(100)?,
            huffman_table_offset: f.u32(104)?,
            huffman_table_length: f.u32(108)?,
            exth_flags: f.u32(112)?,
            reserved_116: f.bytes(116)?,
            reserved_148: f.u32(148)?,
            drm_offset: f.u32(152)?,
            drm_count: f.u32(156)?,
            drm_size: f.u32(160)?,
            drm_flags: f.u32(164)?,
            reserved_168: f.bytes(168)?,
            first_content_record: f.u16(176)?,
            last_content_record: f.u16(178)?,
            reserved_180: f.u32(180)?,
            fcis_record: f.u32(184)?,
            fcis_count: f.u32(188)?,
            flis_record: f.u32(192)?,
            flis_count: f.u32(196)?,
            reserved_200: f.bytes(200)?,
            reserved_208: f.u32(208)?,
            first_compilation_section: f.u32(212)?,
            compilation_section_count: f.u32(216)?,
            reserved_220: f.u32(220)?,
            extra_record_data_flags: f.u32(224)?,
            indx_record: f.u32(228)?,
            extension,
            full_name: String::new(),
        };

        header.full_name = header.resolve_full_name(&cursor);
        Ok(header)
    }

    /// Title bytes live elsewhere in record 0, addressed relative to its start.
    fn resolve_full_name(&self, record0: &ByteCursor<'_>) -> String {
        if self.full_name_length == 0 {
            return String::new();
        }
        match record0.slice(
            self.full_name_offset as usize,
            self.full_name_length as usize,
        ) {
            Ok(bytes) => self.encoding.decode(trim_nul(bytes)).trim().to_string(),
            Err(e) => {
                log::warn!("MOBI full name out of range: {e}");
                String::new()
            }
        }
    }

    /// Re-encode exactly `header_length` bytes, starting with the magic.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; MOBI_LAYOUT_LEN];
        let mut put = |offset: usize, bytes: &[u8]| {
            out[offset..offset + bytes.len()].copy_from_slice(bytes);
        };

        put(0, b"MOBI");
        put(4, &self.header_length.to_be_bytes());
        put(8, &self.mobi_type.to_be_bytes());
        put(12, &self.encoding.code().to_be_bytes());
        put(16, &self.unique_id.to_be_bytes());
        put(20, &self.file_version.to_be_bytes());
        put(24, &self.orthographic_index.to_be_bytes());
        put(28, &self.inflection_index.to_be_bytes());
        put(32, &self.index_names.to_be_bytes());
        put(36, &self.index_keys.to_be_bytes());
        for (i, index) in self.extra_indices.iter().enumerate() {
            put(40 + i * 4, &index.to_be_bytes());
        }
        put(64, &self.first_non_book_index.to_be_bytes());
        put(68, &self.full_name_offset.to_be_bytes());
        put(72, &self.full_name_length.to_be_bytes());
        put(76, &self.locale.to_be_bytes());
        put(80, &self.input_language.to_be_bytes());
        put(84, &self.output_language.to_be_bytes());
        put(88, &self.min_version.to_be_bytes());
        put(92, &self.first_image_index.to_be_bytes());
        put(96, &self.huffman_record_offset.to_be_bytes());
        put(100, &self.huffman_record_count.to_be_bytes());
        put(104, &self.huffman_table_offset.to_be_bytes());
        put(108, &self.huffman_table_length.to_be_bytes());
        put(112, &self.exth_flags.to_be_bytes());
        put(116, &self.reserved_116);
        put(148, &self.reserved_148.to_be_bytes());
        put(152, &self.drm_offset.to_be_bytes());
        put(156, &self.drm_count.to_be_bytes());
        put(160, &self.drm_size.to_be_bytes());
        put(164, &self.drm_flags.to_be_bytes());
        put(168, &self.reserved_168);
        put(176, &self.first_content_record.to_be_bytes());
        put(178, &self.last_content_record.to_be_bytes());
        put(180, &self.reserved_180.to_be_bytes());
        put(184, &self.fcis_record.to_be_bytes());
        put(188, &self.fcis_count.to_be_bytes());
        put(192, &self.flis_record.to_be_bytes());
        put(196, &self.flis_count.to_be_bytes());
        put(200, &self.reserved_200);
        put(208, &self.reserved_208.to_be_bytes());
        put(212, &self.first_compilation_section.to_be_bytes());
        put(216, &self.compilation_section_count.to_be_bytes());
        put(220, &self.reserved_220.to_be_bytes());
        put(224, &self.extra_record_data_flags.to_be_bytes());
        put(228, &self.indx_record.to_be_bytes());

        out.truncate(self.header_length as usize);
        out.extend_from_slice(&self.extension);
        out
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }

    /// Offset of the EXTH block within record 0.
    pub fn exth_offset(&self) -> usize {
        PALMDOC_HEADER_LEN + self.header_length as usize
    }

    pub fn is_kf8(&self) -> bool {
        self.file_version >= 8
    }

    pub fn has_drm(&self) -> bool {
        self.drm_offset != 0 && self.drm_offset != NULL_INDEX
    }

    /// First image record, if the header names one.
    pub fn first_image(&self) -> Option<usize> {
        (self.first_image_index != NULL_INDEX && self.first_image_index != 0)
            .then_some(self.first_image_index as usize)
    }
}
