//! Palm Database (PDB) envelope: the 78-byte file header and record table.

use crate::error::{Error, Result};

use super::cursor::ByteCursor;

/// Size of the fixed PDB header, including the trailing record count.
pub const PDB_HEADER_LEN: usize = 78;

/// Offset of the record count within the PDB header.
const RECORD_COUNT_OFFSET: usize = 76;

/// Size of one record-info entry.
const RECORD_ENTRY_LEN: usize = 8;

/// PDB file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbHeader {
    /// Database name (NUL-terminated in a 32-byte field).
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub created: u32,
    pub modified: u32,
    pub backed_up: u32,
    pub modification_number: u32,
    pub app_info_id: u32,
    pub sort_info_id: u32,
    /// Database type, `BOOK` for MOBI and `TEXt` for PalmDOC.
    pub kind: [u8; 4],
    /// Creator code, `MOBI` for MOBI and `REAd` for PalmDOC.
    pub creator: [u8; 4],
    pub unique_id_seed: u32,
    pub next_record_list_id: u32,
}

impl PdbHeader {
    pub fn parse(cursor: &ByteCursor<'_>) -> Result<Self> {
        Self::parse_fields(cursor).map_err(|e| e.in_section(Error::MalformedRecordTable))
    }

    fn parse_fields(c: &ByteCursor<'_>) -> Result<Self> {
        let mut kind = [0u8; 4];
        kind.copy_from_slice(c.slice(60, 4)?);
        let mut creator = [0u8; 4];
        creator.copy_from_slice(c.slice(64, 4)?);

        Ok(Self {
            name: c.fixed_string(0, 32)?.into_owned(),
            attributes: c.u16_at(32)?,
            version: c.u16_at(34)?,
            created: c.u32_at(36)?,
            modified: c.u32_at(40)?,
            backed_up: c.u32_at(44)?,
            modification_number: c.u32_at(48)?,
            app_info_id: c.u32_at(52)?,
            sort_info_id: c.u32_at(56)?,
            kind,
            creator,
            unique_id_seed: c.u32_at(68)?,
            next_record_list_id: c.u32_at(72)?,
        })
    }

    /// Type and creator joined, e.g. `BOOKMOBI` or `TEXtREAd`.
    pub fn ident(&self) -> String {
        let mut ident = Vec::with_capacity(8);
        ident.extend_from_slice(&self.kind);
        ident.extend_from_slice(&self.creator);
        String::from_utf8_lossy(&ident).into_owned()
    }

    pub fn is_mobi(&self) -> bool {
        &self.kind == b"BOOK" && &self.creator == b"MOBI"
    }
}

/// One entry of the record-info list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Absolute file offset of the record data.
    pub offset: u32,
    pub attributes: u8,
    /// 24-bit record id.
    pub unique_id: u32,
}

/// The record-info list that follows the PDB header.
///
/// Offsets are validated to be strictly increasing and inside the file, so
/// consecutive record spans tile the data area without overlap.
#[derive(Debug, Clone)]
pub struct RecordOffsetTable {
    records: Vec<RawRecord>,
    file_len: usize,
}

impl RecordOffsetTable {
    pub fn parse(cursor: &ByteCursor<'_>) -> Result<Self> {
        let count = cursor
            .u16_at(RECORD_COUNT_OFFSET)
            .map_err(|e| e.in_section(Error::MalformedRecordTable))?
            as usize;

        if count == 0 {
            return Err(Error::MalformedRecordTable("no records".into()));
        }

        let table_end = PDB_HEADER_LEN + count * RECORD_ENTRY_LEN;
        if table_end > cursor.len() {
            return Err(Error::MalformedRecordTable(format!(
                "{count} records need {table_end} bytes, file has {}",
                cursor.len()
            )));
        }

        let mut c = cursor.clone();
        c.seek(PDB_HEADER_LEN)?;

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let record = RawRecord {
                offset: c.read_u32()?,
                attributes: c.read_u8()?,
                unique_id: c.read_u24()?,
            };

            if (record.offset as usize) < table_end || record.offset as usize > cursor.len() {
                return Err(Error::MalformedRecordTable(format!(
                    "record {i} offset {} outside data area {table_end}..{}",
                    record.offset,
                    cursor.len()
                )));
            }
            if let Some(prev) = records.last().map(|r: &RawRecord| r.offset)
                && record.offset <= prev
            {
                return Err(Error::MalformedRecordTable(format!(
                    "record {i} offset {} not after previous offset {prev}",
                    record.offset
                )));
            }

            records.push(record);
        }

        Ok(Self {
            records,
            file_len: cursor.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&RawRecord> {
        self.records.get(index)
    }

    /// Byte range `(start, end)` of a record. The last record runs to the end
    /// of the file.
    pub fn record_span(&self, index: usize) -> Result<(usize, usize)> {
        let record = self.records.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.records.len(),
        })?;

        let start = record.offset as usize;
        let end = self
            .records
            .get(index + 1)
            .map(|next| next.offset as usize)
            .unwrap_or(self.file_len);

        Ok((start, end))
    }
}
