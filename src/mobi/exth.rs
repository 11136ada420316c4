//! EXTH extended-metadata block.

use crate::error::{Error, Result};

use super::cursor::ByteCursor;

/// Size of the fixed EXTH header: magic, length, record count.
const EXTH_HEADER_LEN: usize = 12;

/// Size of each record's `(tag, length)` prefix.
const RECORD_HEADER_LEN: usize = 8;

/// One tagged EXTH record. The value is kept raw; its meaning depends on the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExthRecord {
    pub tag: u32,
    pub value: Vec<u8>,
}

impl ExthRecord {
    pub fn new(tag: u32, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Encoded length, including the 8-byte record header.
    pub fn len(&self) -> usize {
        RECORD_HEADER_LEN + self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// EXTH header and its records, in file order with duplicates kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExthHeader {
    /// Declared length of the block, header included.
    pub header_length: u32,
    pub records: Vec<ExthRecord>,
}

impl ExthHeader {
    /// Parse an EXTH block from the start of `data`.
    ///
    /// Returns `Ok(None)` when `data` does not start with the `EXTH` magic.
    /// A block with the magic but an inconsistent layout is an
    /// [`Error::MalformedExthRecord`].
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        if data.get(..4) != Some(b"EXTH".as_slice()) {
            return Ok(None);
        }
        Self::parse_records(data)
            .map(Some)
            .map_err(|e| e.in_section(Error::MalformedExthRecord))
    }

    fn parse_records(data: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(data);
        c.seek(4)?;
        let header_length = c.read_u32()?;
        let record_count = c.read_u32()?;

        let declared_end = header_length as usize;
        if declared_end < EXTH_HEADER_LEN {
            return Err(Error::MalformedExthRecord(format!(
                "declared length {header_length} shorter than EXTH header"
            )));
        }
        if declared_end > data.len() {
            return Err(Error::MalformedExthRecord(format!(
                "declared length {header_length} exceeds {} available bytes",
                data.len()
            )));
        }

        // Each record takes at least 8 bytes, so the count is bounded by the
        // declared length before anything is allocated.
        let max_records = (declared_end - EXTH_HEADER_LEN) / RECORD_HEADER_LEN;
        let mut records = Vec::with_capacity((record_count as usize).min(max_records));

        for i in 0..record_count {
            let start = c.position();
            if start + RECORD_HEADER_LEN > declared_end {
                return Err(Error::MalformedExthRecord(format!(
                    "record {i} header at {start} passes declared end {declared_end}"
                )));
            }

            let tag = c.read_u32()?;
            let length = c.read_u32()? as usize;
            if length < RECORD_HEADER_LEN {
                return Err(Error::MalformedExthRecord(format!(
                    "record {i} (tag {tag}) has length {length}, minimum is {RECORD_HEADER_LEN}"
                )));
            }
            if start + length > declared_end {
                return Err(Error::MalformedExthRecord(format!(
                    "record {i} (tag {tag}) ends at {}, past declared end {declared_end}",
                    start + length
                )));
            }

            let value = c.read_bytes(length - RECORD_HEADER_LEN)?;
            records.push(ExthRecord::new(tag, value));
        }

        Ok(Self {
            header_length,
            records,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// All records carrying `tag`, in file order.
    pub fn find(&self, tag: u32) -> impl Iterator<Item = &ExthRecord> {
        self.records.iter().filter(move |r| r.tag == tag)
    }

    pub fn first(&self, tag: u32) -> Option<&ExthRecord> {
        self.find(tag).next()
    }

    /// Re-encode the block. Bytes inside the declared length that follow the
    /// last record are written as zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_length as usize);
        out.extend_from_slice(b"EXTH");
        out.extend_from_slice(&self.header_length.to_be_bytes());
        out.extend_from_slice(&(self.records.len() as u32).to_be_bytes());
        for record in &self.records {
            out.extend_from_slice(&record.tag.to_be_bytes());
            out.extend_from_slice(&(record.len() as u32).to_be_bytes());
            out.extend_from_slice(&record.value);
        }
        if out.len() < self.header_length as usize {
            out.resize(self.header_length as usize, 0);
        }
        out
    }

    /// Build a block from records, computing the declared length.
    pub fn from_records(records: Vec<ExthRecord>) -> Self {
        let body: usize = records.iter().map(ExthRecord::len).sum();
        Self {
            header_length: (EXTH_HEADER_LEN + body) as u32,
            records,
        }
    }
}
