//! Container format detection.

use std::path::Path;

use memchr::memmem;

/// Ebook container formats recognized by extension or magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Epub,
    /// MOBI 6 / PalmDOC (`.mobi`, `.prc`, `.pdb`).
    Mobi,
    /// KF8 Kindle books (`.azw`, `.azw3`, `.kf8`).
    Azw3,
    Pdf,
    Cbz,
    Cbr,
    Cb7,
    Cbt,
    Fb2,
    /// Audiobook containers (mp3, m4b, flac, ogg, ...).
    Audio,
}

/// Offset of the PDB type/creator pair (`BOOKMOBI`).
const PDB_IDENT_OFFSET: usize = 60;

impl Format {
    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext.to_ascii_lowercase().as_str() {
            "epub" => Format::Epub,
            "mobi" | "prc" | "pdb" => Format::Mobi,
            "azw" | "azw3" | "kf8" => Format::Azw3,
            "pdf" => Format::Pdf,
            "cbz" => Format::Cbz,
            "cbr" => Format::Cbr,
            "cb7" => Format::Cb7,
            "cbt" => Format::Cbt,
            "fb2" => Format::Fb2,
            "mp3" | "m4a" | "m4b" | "flac" | "ogg" | "opus" | "aac" | "wav" => Format::Audio,
            _ => return None,
        };
        Some(format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Identify a format from the leading bytes of a file.
    ///
    /// Zip archives are reported as EPUB only when the `mimetype` entry says
    /// so; any other zip is taken to be a comic archive.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.get(PDB_IDENT_OFFSET..PDB_IDENT_OFFSET + 8) == Some(b"BOOKMOBI".as_slice())
            || data.get(PDB_IDENT_OFFSET..PDB_IDENT_OFFSET + 8) == Some(b"TEXtREAd".as_slice())
        {
            return Some(Format::Mobi);
        }
        if data.starts_with(b"%PDF") {
            return Some(Format::Pdf);
        }
        if data.starts_with(b"PK\x03\x04") {
            let head = &data[..data.len().min(128)];
            if memmem::find(head, b"mimetypeapplication/epub+zip").is_some() {
                return Some(Format::Epub);
            }
            return Some(Format::Cbz);
        }
        if data.starts_with(b"Rar!\x1a\x07") {
            return Some(Format::Cbr);
        }
        if data.starts_with(b"7z\xBC\xAF\x27\x1C") {
            return Some(Format::Cb7);
        }
        if data.get(257..262) == Some(b"ustar".as_slice()) {
            return Some(Format::Cbt);
        }
        if data.starts_with(b"ID3")
            || data.starts_with(b"fLaC")
            || data.starts_with(b"OggS")
            || data.get(4..8) == Some(b"ftyp".as_slice())
            || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0)
        {
            return Some(Format::Audio);
        }

        let head = &data[..data.len().min(512)];
        if memmem::find(head, b"<FictionBook").is_some() {
            return Some(Format::Fb2);
        }
        None
    }

    /// Combine extension and content. Magic bytes win, except that a MOBI
    /// container named `.azw3` stays [`Format::Azw3`].
    pub fn detect(path: Option<&Path>, data: &[u8]) -> Option<Self> {
        let by_ext = path.and_then(Self::from_path);
        match (Self::sniff(data), by_ext) {
            (Some(Format::Mobi), Some(Format::Azw3)) => Some(Format::Azw3),
            // a generic zip keeps an extension that names a zip-based format
            (Some(Format::Cbz), Some(ext @ Format::Epub)) => Some(ext),
            (Some(sniffed), _) => Some(sniffed),
            (None, ext) => ext,
        }
    }

    /// Whether metadata beyond the file name can be extracted.
    pub fn has_parser(self) -> bool {
        matches!(
            self,
            Format::Epub | Format::Mobi | Format::Azw3 | Format::Cbz
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Epub => "epub",
            Format::Mobi => "mobi",
            Format::Azw3 => "azw3",
            Format::Pdf => "pdf",
            Format::Cbz => "cbz",
            Format::Cbr => "cbr",
            Format::Cb7 => "cb7",
            Format::Cbt => "cbt",
            Format::Fb2 => "fb2",
            Format::Audio => "audio",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
