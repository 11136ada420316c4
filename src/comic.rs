//! Comic book archives (CBZ) with optional `ComicInfo.xml` metadata.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::book::{BookAuthor, Ebook, EbookCover, ReadOptions};
use crate::error::Result;
use crate::format::Format;
use crate::util::{detect_image_type, image_type_for_path, normalize_whitespace, resolve_entity};

/// Fields of a `ComicInfo.xml` document, keyed by element name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComicInfo {
    fields: BTreeMap<String, String>,
}

impl ComicInfo {
    /// Parse the flat element list under `<ComicInfo>`. Nested blocks such
    /// as `<Pages>` are skipped.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut fields = BTreeMap::new();
        let mut depth = 0usize;
        let mut current: Option<String> = None;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    depth += 1;
                    current = (depth == 2)
                        .then(|| String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    text.clear();
                }
                Event::Text(e) if current.is_some() => {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(e) if current.is_some() => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(resolved) => text.push_str(&resolved),
                        None => log::debug!("unknown entity &{entity}; in ComicInfo.xml"),
                    }
                }
                Event::End(_) => {
                    if let Some(name) = current.take() {
                        let value = text.trim();
                        if !value.is_empty() {
                            fields.entry(name).or_insert_with(|| value.to_string());
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A comma-separated field as a list.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.trim().parse().ok()
    }

    /// `Year`, `Month` and `Day` combined; a missing month or day is 1.
    pub fn date(&self) -> Option<NaiveDate> {
        let year = self.number::<i32>("Year")?;
        let month = self.number::<u32>("Month").unwrap_or(1);
        let day = self.number::<u32>("Day").unwrap_or(1);
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Contributor elements other than `Writer`, stored as extras.
const ARTIST_FIELDS: &[(&str, &str)] = &[
    ("Penciller", "penciller"),
    ("Inker", "inker"),
    ("Colorist", "colorist"),
    ("Letterer", "letterer"),
    ("CoverArtist", "cover_artist"),
    ("Editor", "editor"),
];

pub fn read_comic<P: AsRef<Path>>(path: P) -> Result<Ebook> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let mut book = read_metadata(&data, &ReadOptions::default())?;
    if book.title.is_none() {
        book.title = Ebook::title_from_path(path);
    }
    book.path = Some(path.to_path_buf());
    Ok(book)
}

/// Read metadata from an in-memory CBZ archive.
pub fn read_metadata(data: &[u8], options: &ReadOptions) -> Result<Ebook> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let mut pages: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && image_type_for_path(name).is_some())
        .map(str::to_string)
        .collect();
    pages.sort();

    let info_name = archive
        .file_names()
        .find(|name| {
            name.rsplit('/')
                .next()
                .is_some_and(|base| base.eq_ignore_ascii_case("ComicInfo.xml"))
        })
        .map(str::to_string);

    let mut book = Ebook::new(Format::Cbz);
    if let Some(name) = info_name {
        let mut xml = String::new();
        archive.by_name(&name)?.read_to_string(&mut xml)?;
        apply_comic_info(&mut book, &ComicInfo::parse(&xml)?);
    } else {
        log::debug!("no ComicInfo.xml in archive");
    }
    book.push_extra("pages", pages.len().to_string());

    if options.with_cover
        && let Some(first) = pages.first()
    {
        let mut data = Vec::new();
        archive.by_name(first)?.read_to_end(&mut data)?;
        let media_type = detect_image_type(&data).or_else(|| image_type_for_path(first));
        if let Some(media_type) = media_type {
            book.cover = Some(EbookCover {
                media_type: media_type.to_string(),
                data,
            });
        }
    }

    Ok(book)
}

/// Map ComicInfo fields onto the book model.
pub fn apply_comic_info(book: &mut Ebook, info: &ComicInfo) {
    book.series = info.get("Series").map(normalize_whitespace);
    book.volume = info.number("Number").or_else(|| info.number("Volume"));
    book.title = info.get("Title").map(normalize_whitespace).or_else(|| {
        let series = book.series.as_deref()?;
        Some(match info.get("Number") {
            Some(number) => format!("{series} #{number}"),
            None => series.to_string(),
        })
    });

    for writer in info.list("Writer") {
        book.authors.push(BookAuthor::new(writer).with_role("aut"));
    }
    for (field, key) in ARTIST_FIELDS {
        if let Some(value) = info.get(field) {
            book.push_extra(key, value);
        }
    }

    book.description = info.get("Summary").map(str::to_string);
    book.publisher = info.get("Publisher").map(str::to_string);
    book.language = info.get("LanguageISO").map(str::to_string);
    book.publish_date = info.date().map(|d| d.and_time(NaiveTime::MIN));

    let mut tags = info.list("Genre");
    for tag in info.list("Tags") {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    book.tags = tags;

    if let Some(gtin) = info.get("GTIN") {
        book.push_identifier(Some("gtin"), gtin);
    }
    if let Some(imprint) = info.get("Imprint") {
        book.push_extra("imprint", imprint);
    }
    if let Some(web) = info.get("Web") {
        book.push_extra("web", web);
    }
    if let Some(count) = info.get("Count") {
        book.push_extra("series_count", count);
    }
}
