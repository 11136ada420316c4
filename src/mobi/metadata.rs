//! Typed view over EXTH records.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::util::parse_date;

use super::exth::{ExthHeader, ExthRecord};
use super::headers::{MobiHeader, NULL_INDEX};
use super::tags::{ExthKind, ExthTag};

/// A decoded EXTH value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExthValue<'a> {
    Text(String),
    Integer(u32),
    Flag(bool),
    Date(NaiveDateTime),
    Binary(&'a [u8]),
}

impl std::fmt::Display for ExthValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExthValue::Text(s) => f.write_str(s),
            ExthValue::Integer(v) => write!(f, "{v}"),
            ExthValue::Flag(v) => write!(f, "{v}"),
            ExthValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            ExthValue::Binary(bytes) => {
                for b in bytes.iter().take(32) {
                    write!(f, "{b:02x}")?;
                }
                if bytes.len() > 32 {
                    write!(f, "... ({} bytes)", bytes.len())?;
                }
                Ok(())
            }
        }
    }
}

/// Read-only metadata accessors for a MOBI file.
///
/// Nothing is cached: every accessor scans the EXTH records again. Missing
/// tags come back as `None` (or an empty list for repeatable tags), which
/// is distinct from a present but empty value.
#[derive(Debug, Clone, Copy)]
pub struct MobiMetadata<'a> {
    header: &'a MobiHeader,
    exth: Option<&'a ExthHeader>,
}

impl<'a> MobiMetadata<'a> {
    pub fn new(header: &'a MobiHeader, exth: Option<&'a ExthHeader>) -> Self {
        Self { header, exth }
    }

    pub fn has_exth(&self) -> bool {
        self.exth.is_some()
    }

    fn records(&self, tag: ExthTag) -> impl Iterator<Item = &'a ExthRecord> + 'a {
        let id = tag.id();
        self.exth
            .into_iter()
            .flat_map(|exth| exth.records.iter())
            .filter(move |r| r.tag == id)
    }

    fn decode(&self, record: &ExthRecord) -> String {
        self.header.encoding.decode(&record.value).trim().to_string()
    }

    // --- Generic accessors ---

    /// First record of `tag` as text.
    pub fn text(&self, tag: ExthTag) -> Option<String> {
        self.records(tag).next().map(|r| self.decode(r))
    }

    /// Every record of `tag` as text, in file order.
    pub fn texts(&self, tag: ExthTag) -> Vec<String> {
        self.records(tag).map(|r| self.decode(r)).collect()
    }

    /// First record of `tag` as a big-endian unsigned integer.
    pub fn integer(&self, tag: ExthTag) -> Option<u32> {
        self.records(tag).next().and_then(|r| decode_uint(&r.value))
    }

    pub fn flag(&self, tag: ExthTag) -> Option<bool> {
        self.integer(tag).map(|v| v != 0)
    }

    pub fn date(&self, tag: ExthTag) -> Option<NaiveDateTime> {
        let raw = self.text(tag)?;
        let date = parse_date(&raw);
        if date.is_none() {
            log::warn!("unparseable EXTH {} date: {raw:?}", tag.name());
        }
        date
    }

    pub fn binary(&self, tag: ExthTag) -> Option<&'a [u8]> {
        self.records(tag).next().map(|r| r.value.as_slice())
    }

    /// Decode one record according to the kind its tag declares. Integers of
    /// an unsupported width and unparseable dates fall back to text.
    pub fn decode_record(&self, record: &'a ExthRecord) -> ExthValue<'a> {
        let kind = ExthTag::from_id(record.tag)
            .map(ExthTag::kind)
            .unwrap_or(ExthKind::Binary);
        match kind {
            ExthKind::Text => ExthValue::Text(self.decode(record)),
            ExthKind::Integer => match decode_uint(&record.value) {
                Some(v) => ExthValue::Integer(v),
                None => ExthValue::Binary(&record.value),
            },
            ExthKind::Flag => match decode_uint(&record.value) {
                Some(v) => ExthValue::Flag(v != 0),
                None => ExthValue::Binary(&record.value),
            },
            ExthKind::Date => {
                let text = self.decode(record);
                match parse_date(&text) {
                    Some(date) => ExthValue::Date(date),
                    None => ExthValue::Text(text),
                }
            }
            ExthKind::Binary => ExthValue::Binary(&record.value),
        }
    }

    /// Records whose tag has no known meaning, grouped by tag id.
    pub fn extra(&self) -> BTreeMap<u32, Vec<&'a [u8]>> {
        let mut extra: BTreeMap<u32, Vec<&'a [u8]>> = BTreeMap::new();
        for record in self.exth.iter().flat_map(|e| e.records.iter()) {
            if ExthTag::from_id(record.tag).is_none() {
                extra.entry(record.tag).or_default().push(&record.value);
            }
        }
        extra
    }

    // --- Bibliographic fields ---

    /// Best available title: EXTH updated title, then the MOBI full name.
    pub fn title(&self) -> Option<String> {
        self.updated_title()
            .filter(|t| !t.is_empty())
            .or_else(|| Some(self.header.full_name.clone()).filter(|t| !t.is_empty()))
    }

    pub fn authors(&self) -> Vec<String> {
        self.texts(ExthTag::Author)
    }

    pub fn publisher(&self) -> Option<String> {
        self.text(ExthTag::Publisher)
    }

    pub fn imprint(&self) -> Option<String> {
        self.text(ExthTag::Imprint)
    }

    pub fn description(&self) -> Option<String> {
        self.text(ExthTag::Description)
    }

    pub fn isbns(&self) -> Vec<String> {
        self.texts(ExthTag::Isbn)
    }

    /// Subjects; a single record may hold several separated by `;`.
    pub fn subjects(&self) -> Vec<String> {
        self.texts(ExthTag::Subject)
            .iter()
            .flat_map(|s| s.split(';'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Publishing date as written in the file.
    pub fn publishing_date(&self) -> Option<String> {
        self.text(ExthTag::PublishingDate)
    }

    /// Publishing date parsed to a calendar date.
    pub fn published(&self) -> Option<NaiveDateTime> {
        self.date(ExthTag::PublishingDate)
    }

    pub fn review(&self) -> Option<String> {
        self.text(ExthTag::Review)
    }

    pub fn contributors(&self) -> Vec<String> {
        self.texts(ExthTag::Contributor)
    }

    pub fn rights(&self) -> Option<String> {
        self.text(ExthTag::Rights)
    }

    pub fn subject_codes(&self) -> Vec<String> {
        self.texts(ExthTag::SubjectCode)
    }

    pub fn content_type(&self) -> Option<String> {
        self.text(ExthTag::Type)
    }

    pub fn source(&self) -> Option<String> {
        self.text(ExthTag::Source)
    }

    pub fn asin(&self) -> Option<String> {
        self.text(ExthTag::Asin)
            .or_else(|| self.text(ExthTag::Asin504))
    }

    pub fn version(&self) -> Option<String> {
        self.text(ExthTag::VersionNumber)
    }

    pub fn language(&self) -> Option<String> {
        self.text(ExthTag::Language)
    }

    /// Every declared language, primary first.
    pub fn languages(&self) -> Vec<String> {
        self.texts(ExthTag::Language)
    }

    pub fn updated_title(&self) -> Option<String> {
        self.text(ExthTag::UpdatedTitle)
    }

    pub fn title_file_as(&self) -> Option<String> {
        self.text(ExthTag::TitleFileAs)
    }

    pub fn creator_file_as(&self) -> Option<String> {
        self.text(ExthTag::CreatorFileAs)
    }

    // --- Kindle / vendor fields ---

    pub fn sample(&self) -> Option<bool> {
        self.flag(ExthTag::Sample)
    }

    pub fn start_reading(&self) -> Option<u32> {
        self.integer(ExthTag::StartReading)
    }

    pub fn adult(&self) -> Option<bool> {
        self.text(ExthTag::Adult)
            .map(|v| v.eq_ignore_ascii_case("yes") || v == "1")
    }

    pub fn retail_price(&self) -> Option<String> {
        self.text(ExthTag::RetailPrice)
    }

    pub fn retail_currency(&self) -> Option<String> {
        self.text(ExthTag::RetailCurrency)
    }

    /// First record of the KF8 section in combination MOBI6/KF8 files.
    pub fn kf8_boundary(&self) -> Option<u32> {
        self.integer(ExthTag::Kf8Boundary).filter(|&v| v != NULL_INDEX)
    }

    pub fn fixed_layout(&self) -> Option<bool> {
        self.text(ExthTag::FixedLayout).map(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn book_type(&self) -> Option<String> {
        self.text(ExthTag::BookType)
    }

    pub fn orientation_lock(&self) -> Option<String> {
        self.text(ExthTag::OrientationLock)
    }

    pub fn original_resolution(&self) -> Option<String> {
        self.text(ExthTag::OriginalResolution)
    }

    pub fn metadata_resource_uri(&self) -> Option<String> {
        self.text(ExthTag::MetadataResourceUri)
    }

    pub fn dictionary_short_name(&self) -> Option<String> {
        self.text(ExthTag::DictionaryShortName)
    }

    /// Cover image index, relative to the first image record.
    pub fn cover_offset(&self) -> Option<u32> {
        self.integer(ExthTag::CoverOffset).filter(|&v| v != NULL_INDEX)
    }

    /// Thumbnail image index, relative to the first image record.
    pub fn thumb_offset(&self) -> Option<u32> {
        self.integer(ExthTag::ThumbOffset).filter(|&v| v != NULL_INDEX)
    }

    pub fn has_fake_cover(&self) -> Option<bool> {
        self.flag(ExthTag::HasFakeCover)
    }

    /// Absolute record index of the cover image.
    pub fn cover_record(&self) -> Option<usize> {
        self.image_record(self.cover_offset()?)
    }

    /// Absolute record index of the thumbnail image.
    pub fn thumbnail_record(&self) -> Option<usize> {
        self.image_record(self.thumb_offset()?)
    }

    fn image_record(&self, offset: u32) -> Option<usize> {
        let first = self.header.first_image()?;
        first.checked_add(offset as usize)
    }

    /// `(software, major, minor, build)` of the tool that produced the file.
    pub fn creator(&self) -> Option<(u32, u32, u32, u32)> {
        Some((
            self.integer(ExthTag::CreatorSoftware)?,
            self.integer(ExthTag::CreatorMajorVersion).unwrap_or(0),
            self.integer(ExthTag::CreatorMinorVersion).unwrap_or(0),
            self.integer(ExthTag::CreatorBuildNumber).unwrap_or(0),
        ))
    }

    pub fn clipping_limit(&self) -> Option<u32> {
        self.integer(ExthTag::ClippingLimit)
    }

    pub fn publisher_limit(&self) -> Option<u32> {
        self.integer(ExthTag::PublisherLimit)
    }

    pub fn text_to_speech_disabled(&self) -> Option<bool> {
        self.flag(ExthTag::TextToSpeechDisabled)
    }

    pub fn rent_expiration_date(&self) -> Option<&'a [u8]> {
        self.binary(ExthTag::RentExpirationDate)
    }

    pub fn watermark(&self) -> Option<&'a [u8]> {
        self.binary(ExthTag::Watermark)
    }

    pub fn font_signature(&self) -> Option<&'a [u8]> {
        self.binary(ExthTag::FontSignature)
    }

    pub fn cde_content_type(&self) -> Option<String> {
        self.text(ExthTag::CdeContentType)
    }

    pub fn last_update_time(&self) -> Option<NaiveDateTime> {
        self.date(ExthTag::LastUpdateTime)
    }

    pub fn writing_mode(&self) -> Option<String> {
        self.text(ExthTag::WritingMode)
    }

    pub fn page_progression_direction(&self) -> Option<String> {
        self.text(ExthTag::PageProgressionDirection)
    }

    pub fn creator_build_tag(&self) -> Option<String> {
        self.text(ExthTag::CreatorBuildTag)
    }

    pub fn in_memory(&self) -> Option<String> {
        self.text(ExthTag::InMemory)
    }
}

/// Decode a 1 to 4 byte big-endian unsigned integer.
fn decode_uint(bytes: &[u8]) -> Option<u32> {
    match bytes.len() {
        1..=4 => Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)),
        _ => None,
    }
}
