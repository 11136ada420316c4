//! Format-agnostic book model that every reader normalizes into.

mod reader;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::format::Format;

pub use reader::ReadOptions;

/// Normalized ebook metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Ebook {
    pub path: Option<PathBuf>,
    pub format: Format,
    pub title: Option<String>,
    /// Authors in the order the file lists them.
    pub authors: Vec<BookAuthor>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub identifiers: Vec<BookIdentifier>,
    pub tags: Vec<String>,
    pub publish_date: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub series: Option<String>,
    /// Position in the series; fractional for in-between volumes.
    pub volume: Option<f32>,
    pub copyright: Option<String>,
    pub cover: Option<EbookCover>,
    /// Format-specific fields with no slot of their own.
    pub extras: BTreeMap<String, String>,
    /// False when only the format and file name are known.
    pub has_parser: bool,
}

/// A contributor to the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAuthor {
    pub name: String,
    /// MARC relator code such as `aut` or `ill`.
    pub role: Option<String>,
    /// Sort form, e.g. "Carroll, Lewis".
    pub file_as: Option<String>,
}

impl BookAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            file_as: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_file_as(mut self, file_as: impl Into<String>) -> Self {
        self.file_as = Some(file_as.into());
        self
    }
}

/// An identifier with its scheme (`isbn`, `asin`, `uuid`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookIdentifier {
    pub scheme: Option<String>,
    pub value: String,
}

impl BookIdentifier {
    pub fn new(scheme: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.map(|s| s.to_ascii_lowercase()),
            value: value.into(),
        }
    }
}

/// Cover image bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EbookCover {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for EbookCover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EbookCover")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Ebook {
    pub fn new(format: Format) -> Self {
        Self {
            path: None,
            format,
            title: None,
            authors: Vec::new(),
            publisher: None,
            description: None,
            identifiers: Vec::new(),
            tags: Vec::new(),
            publish_date: None,
            language: None,
            series: None,
            volume: None,
            copyright: None,
            cover: None,
            extras: BTreeMap::new(),
            has_parser: format.has_parser(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(BookAuthor::new(author));
        self
    }

    pub fn with_identifier(mut self, scheme: Option<&str>, value: impl Into<String>) -> Self {
        self.identifiers.push(BookIdentifier::new(scheme, value));
        self
    }

    /// First author, if any.
    pub fn author_main(&self) -> Option<&BookAuthor> {
        self.authors.first()
    }

    /// First identifier with the given scheme.
    pub fn identifier(&self, scheme: &str) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.scheme.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(scheme)))
            .map(|id| id.value.as_str())
    }

    pub fn isbn(&self) -> Option<&str> {
        self.identifier("isbn")
    }

    /// Record an identifier unless the same scheme and value are present.
    pub(crate) fn push_identifier(&mut self, scheme: Option<&str>, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let id = BookIdentifier::new(scheme, value);
        if !self.identifiers.contains(&id) {
            self.identifiers.push(id);
        }
    }

    pub(crate) fn push_extra(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.extras.insert(key.to_string(), value);
        }
    }

    /// Title derived from a file stem, used when the file carries none.
    pub(crate) fn title_from_path(path: &std::path::Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy();
        let title = stem.replace(['_', '.'], " ");
        let title = crate::util::normalize_whitespace(&title);
        (!title.is_empty()).then_some(title)
    }
}
