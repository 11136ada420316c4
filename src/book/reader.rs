//! Entry points that detect a file's format and run the matching reader.

use std::path::Path;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::{comic, epub, mobi};

use super::Ebook;

/// Options controlling what a read extracts.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Load cover image bytes. Turn off to avoid holding large images.
    pub with_cover: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { with_cover: true }
    }
}

impl ReadOptions {
    pub fn without_cover() -> Self {
        Self { with_cover: false }
    }
}

impl Ebook {
    /// Read metadata from a file, detecting its format.
    ///
    /// Formats without a metadata parser (PDF, audio, CBR, ...) yield a book
    /// with only the format and a title taken from the file name.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_with(path, &ReadOptions::default())
    }

    pub fn read_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = Format::detect(Some(path), &data)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        log::debug!("{} detected as {format}", path.display());

        let mut book = read_format(format, data, options)?;
        if book.title.is_none() {
            book.title = Ebook::title_from_path(path);
        }
        book.path = Some(path.to_path_buf());
        Ok(book)
    }

    /// Read metadata from an in-memory file, detecting the format from its
    /// content alone.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(data, &ReadOptions::default())
    }

    pub fn from_bytes_with(data: Vec<u8>, options: &ReadOptions) -> Result<Self> {
        let format = Format::sniff(&data)
            .ok_or_else(|| Error::UnsupportedFormat("unrecognized file content".to_string()))?;
        read_format(format, data, options)
    }
}

fn read_format(format: Format, data: Vec<u8>, options: &ReadOptions) -> Result<Ebook> {
    match format {
        Format::Mobi | Format::Azw3 => {
            let mut book = mobi::read_metadata(data, options)?;
            if format == Format::Azw3 {
                book.format = Format::Azw3;
            }
            Ok(book)
        }
        Format::Epub => epub::read_metadata(&data, options),
        // zip writers do not always store `mimetype` first, so a zip holding
        // an OPF container is still an EPUB
        Format::Cbz if epub::is_epub_archive(&data) => epub::read_metadata(&data, options),
        Format::Cbz => comic::read_metadata(&data, options),
        other => {
            log::debug!("no metadata parser for {other}");
            Ok(Ebook::new(other))
        }
    }
}
