//! A fully decoded MOBI/PDB file held in memory.

use std::path::Path;

use crate::error::{Error, Result};
use crate::util::detect_image_type;

use super::cursor::ByteCursor;
use super::exth::ExthHeader;
use super::headers::{MobiHeader, PalmDocHeader};
use super::metadata::MobiMetadata;
use super::pdb::{PdbHeader, RecordOffsetTable};

/// A MOBI file with every header of record 0 decoded.
///
/// Headers are decoded once in [`MobiContainer::parse`] and never change;
/// record contents are sliced from the owned buffer on request. The
/// container is `Send + Sync` and can be shared between threads.
#[derive(Debug)]
pub struct MobiContainer {
    data: Vec<u8>,
    pdb: PdbHeader,
    records: RecordOffsetTable,
    palmdoc: PalmDocHeader,
    mobi: MobiHeader,
    exth: Option<ExthHeader>,
    exth_error: Option<Error>,
}

impl MobiContainer {
    /// Read and parse a MOBI file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(data)
    }

    /// Parse a complete MOBI file.
    ///
    /// Stages run in dependency order: PDB header, record table, PalmDOC
    /// header, MOBI header, EXTH. A failure in any stage but the last aborts
    /// the parse. A malformed EXTH block only drops the EXTH metadata; the
    /// failure is kept in [`exth_error`](Self::exth_error).
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let cursor = ByteCursor::new(&data);
        let pdb = PdbHeader::parse(&cursor)?;
        let records = RecordOffsetTable::parse(&cursor)?;

        let (start, end) = records.record_span(0)?;
        let record0 = cursor
            .slice(start, end - start)
            .map_err(|e| e.in_section(Error::MalformedRecordTable))?;

        let palmdoc =
            PalmDocHeader::parse(record0).map_err(|e| e.in_section(Error::NotMobiFormat))?;
        let mobi = MobiHeader::parse(record0)?;

        let (exth, exth_error) = if mobi.has_exth() {
            let exth_data = record0.get(mobi.exth_offset()..).unwrap_or_default();
            match ExthHeader::parse(exth_data) {
                Ok(Some(exth)) => (Some(exth), None),
                Ok(None) => {
                    log::debug!("EXTH flag set but no EXTH block found");
                    (None, None)
                }
                Err(e) => {
                    log::warn!("ignoring malformed EXTH block: {e}");
                    (None, Some(e))
                }
            }
        } else {
            (None, None)
        };

        log::debug!(
            "parsed MOBI {:?}: {} records, version {}, {:?}, exth: {}",
            pdb.name,
            records.len(),
            mobi.file_version,
            mobi.encoding,
            exth.as_ref().map_or(0, ExthHeader::record_count)
        );

        Ok(Self {
            data,
            pdb,
            records,
            palmdoc,
            mobi,
            exth,
            exth_error,
        })
    }

    pub fn pdb_header(&self) -> &PdbHeader {
        &self.pdb
    }

    pub fn record_table(&self) -> &RecordOffsetTable {
        &self.records
    }

    pub fn palmdoc_header(&self) -> &PalmDocHeader {
        &self.palmdoc
    }

    pub fn mobi_header(&self) -> &MobiHeader {
        &self.mobi
    }

    /// The EXTH block, or `None` when the file has none or it was malformed.
    pub fn exth_header(&self) -> Option<&ExthHeader> {
        self.exth.as_ref()
    }

    /// Why the EXTH block was dropped, if it was present but malformed.
    pub fn exth_error(&self) -> Option<&Error> {
        self.exth_error.as_ref()
    }

    /// Typed metadata accessors.
    pub fn metadata(&self) -> MobiMetadata<'_> {
        MobiMetadata::new(&self.mobi, self.exth.as_ref())
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Raw bytes of a record.
    pub fn record(&self, index: usize) -> Result<&[u8]> {
        let (start, end) = self.records.record_span(index)?;
        Ok(&self.data[start..end])
    }

    /// Raw bytes of record 0 (PalmDOC, MOBI and EXTH headers).
    pub fn record0(&self) -> &[u8] {
        // record 0 was sliced successfully during parse
        self.record(0).unwrap_or_default()
    }

    /// Cover image bytes and media type, when the EXTH names a cover record
    /// that holds a recognizable image.
    pub fn cover(&self) -> Option<(&[u8], &'static str)> {
        self.image(self.metadata().cover_record()?)
    }

    pub fn thumbnail(&self) -> Option<(&[u8], &'static str)> {
        self.image(self.metadata().thumbnail_record()?)
    }

    fn image(&self, index: usize) -> Option<(&[u8], &'static str)> {
        let data = self.record(index).ok()?;
        match detect_image_type(data) {
            Some(media_type) => Some((data, media_type)),
            None => {
                log::debug!("record {index} is not an image");
                None
            }
        }
    }

    /// Length of the whole file.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
