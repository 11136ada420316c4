//! Error types for bookmeta operations.

use thiserror::Error;

/// Errors that can occur while reading ebook metadata.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A read of `len` bytes at `offset` would pass the end of a `size`-byte buffer.
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    /// Record 0 does not carry a MOBI header.
    #[error("Not a MOBI file: {0}")]
    NotMobiFormat(String),

    #[error("Malformed PDB record table: {0}")]
    MalformedRecordTable(String),

    #[error("Malformed EXTH record: {0}")]
    MalformedExthRecord(String),

    #[error("Record index {index} out of range ({count} records)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Re-labels a bounds failure as the structural error of the section
    /// being decoded. Other errors pass through unchanged.
    pub(crate) fn in_section(self, wrap: fn(String) -> Error) -> Error {
        match self {
            Error::OutOfBounds { .. } => wrap(self.to_string()),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
