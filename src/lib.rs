//! # bookmeta
//!
//! A fast, lightweight library for reading metadata out of ebook files.
//!
//! ## Features
//!
//! - MOBI/AZW3 (KF8): Palm database, PalmDOC, MOBI and EXTH headers decoded
//!   directly from the file bytes
//! - EPUB 2/3: OPF metadata, calibre series, cover image
//! - CBZ comic archives with `ComicInfo.xml`
//! - Format detection by magic bytes and extension; PDF, audiobooks and
//!   other archives are recognized but carry only file-level metadata
//!
//! ## Quick Start
//!
//! ```no_run
//! use bookmeta::Ebook;
//!
//! let book = Ebook::read("alice.mobi")?;
//! println!("{:?} by {:?}", book.title, book.author_main().map(|a| &a.name));
//! # Ok::<(), bookmeta::Error>(())
//! ```
//!
//! ## Working with MOBI Headers
//!
//! [`mobi::MobiContainer`] exposes every decoded header and the raw EXTH
//! records:
//!
//! ```no_run
//! use bookmeta::mobi::{ExthTag, MobiContainer};
//!
//! let container = MobiContainer::open("alice.mobi")?;
//! println!("version {}", container.mobi_header().file_version);
//! let meta = container.metadata();
//! for author in meta.authors() {
//!     println!("author: {author}");
//! }
//! println!("ASIN: {:?}", meta.text(ExthTag::Asin));
//! # Ok::<(), bookmeta::Error>(())
//! ```

pub mod book;
pub mod comic;
pub mod epub;
pub mod error;
pub mod format;
pub mod mobi;
pub(crate) mod util;

pub use book::{BookAuthor, BookIdentifier, Ebook, EbookCover, ReadOptions};
pub use error::{Error, Result};
pub use format::Format;
pub use comic::read_comic;
pub use epub::read_epub;
pub use mobi::{MobiContainer, read_mobi};
