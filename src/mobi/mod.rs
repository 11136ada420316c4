//! MOBI/AZW container parsing.
//!
//! A MOBI file is a Palm database: a 78-byte header, a table of record
//! offsets, then the records. Record 0 holds the PalmDOC header, the MOBI
//! header and, optionally, an EXTH block of tagged metadata.
//!
//! ```no_run
//! use bookmeta::mobi::MobiContainer;
//!
//! let container = MobiContainer::open("book.mobi")?;
//! let meta = container.metadata();
//! println!("{:?} by {:?}", meta.title(), meta.authors());
//! # Ok::<(), bookmeta::Error>(())
//! ```

mod container;
mod cursor;
mod exth;
mod headers;
mod metadata;
mod pdb;
mod reader;
mod tags;

pub use container::MobiContainer;
pub use cursor::ByteCursor;
pub use exth::{ExthHeader, ExthRecord};
pub use headers::{
    Compression, Encoding, Encryption, MobiHeader, PalmDocHeader, MOBI_LAYOUT_LEN, NULL_INDEX,
    PALMDOC_HEADER_LEN,
};
pub use metadata::{ExthValue, MobiMetadata};
pub use pdb::{PdbHeader, RawRecord, RecordOffsetTable, PDB_HEADER_LEN};
pub use reader::{read_metadata, read_mobi, to_ebook};
pub use tags::{ExthKind, ExthTag};
