//! Normalize a decoded MOBI container into an [`Ebook`].

use std::path::Path;

use crate::book::{BookAuthor, Ebook, EbookCover, ReadOptions};
use crate::error::Result;
use crate::format::Format;
use crate::util::split_list;

use super::container::MobiContainer;

/// Read MOBI/AZW3 metadata from a file.
pub fn read_mobi<P: AsRef<Path>>(path: P) -> Result<Ebook> {
    let path = path.as_ref();
    let mut book = read_metadata(std::fs::read(path)?, &ReadOptions::default())?;
    book.path = Some(path.to_path_buf());
    Ok(book)
}

/// Parse a MOBI file held in memory and normalize its metadata.
pub fn read_metadata(data: Vec<u8>, options: &ReadOptions) -> Result<Ebook> {
    let container = MobiContainer::parse(data)?;
    Ok(to_ebook(&container, options))
}

/// Map container headers and EXTH records onto the book model.
pub fn to_ebook(container: &MobiContainer, options: &ReadOptions) -> Ebook {
    let meta = container.metadata();
    let header = container.mobi_header();

    let format = if header.is_kf8() || meta.kf8_boundary().is_some() {
        Format::Azw3
    } else {
        Format::Mobi
    };
    let mut book = Ebook::new(format);

    book.title = meta
        .title()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            let name = container.pdb_header().name.replace('_', " ");
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_string())
        });

    let file_as = meta.creator_file_as();
    for (i, name) in meta.authors().iter().flat_map(|a| split_list(a)).enumerate() {
        let mut author = BookAuthor::new(name).with_role("aut");
        if i == 0
            && let Some(sort) = &file_as
        {
            author = author.with_file_as(sort.clone());
        }
        book.authors.push(author);
    }
    for name in meta.contributors().iter().flat_map(|c| split_list(c)) {
        // calibre stamps itself as a contributor
        if name.starts_with("calibre (") {
            book.push_extra("producer", name);
            continue;
        }
        book.authors.push(BookAuthor::new(name).with_role("ctb"));
    }

    book.publisher = meta.publisher();
    book.description = meta.description();
    book.copyright = meta.rights();
    let mut languages = meta.languages().into_iter();
    book.language = languages.next();
    let others: Vec<String> = languages.collect();
    if !others.is_empty() {
        book.push_extra("languages", others.join(", "));
    }
    book.publish_date = meta.published();
    book.tags = meta.subjects();

    for isbn in meta.isbns() {
        book.push_identifier(Some("isbn"), &isbn);
    }
    if let Some(asin) = meta.asin() {
        book.push_identifier(Some("asin"), &asin);
    }
    if let Some(source) = meta.source() {
        match source.split_once(':') {
            Some((scheme, value)) if scheme.eq_ignore_ascii_case("calibre") => {
                book.push_identifier(Some("uuid"), value)
            }
            Some((scheme, value)) if scheme.eq_ignore_ascii_case("urn") => {
                let value = value.strip_prefix("uuid:").unwrap_or(value);
                book.push_identifier(Some("uuid"), value)
            }
            _ => book.push_extra("source", source),
        }
    }

    if let Some(imprint) = meta.imprint() {
        book.push_extra("imprint", imprint);
    }
    if let Some(review) = meta.review() {
        book.push_extra("review", review);
    }
    if let Some(kind) = meta.cde_content_type() {
        book.push_extra("cde_content_type", kind);
    }
    if let Some(updated) = meta.updated_title() {
        book.push_extra("updated_title", updated);
    }
    if let Some(title_sort) = meta.title_file_as() {
        book.push_extra("title_file_as", title_sort);
    }
    if let Some(direction) = meta.page_progression_direction() {
        book.push_extra("page_progression_direction", direction);
    }
    if meta.fixed_layout() == Some(true) {
        book.push_extra("fixed_layout", "true");
    }
    if meta.sample() == Some(true) {
        book.push_extra("sample", "true");
    }
    if header.has_drm() || container.palmdoc_header().is_encrypted() {
        book.push_extra("drm", "true");
    }
    book.push_extra("mobi_version", header.file_version.to_string());

    for (tag, values) in meta.extra() {
        if let Some(value) = values.first() {
            book.push_extra(&format!("exth_{tag}"), hex(value));
        }
    }

    if options.with_cover {
        book.cover = container.cover().map(|(data, media_type)| EbookCover {
            media_type: media_type.to_string(),
            data: data.to_vec(),
        });
        if book.cover.is_none() && meta.cover_offset().is_some() {
            log::debug!("cover record {:?} holds no image", meta.cover_record());
        }
    }

    log::debug!(
        "MOBI metadata: {} authors, {} EXTH records",
        book.authors.len(),
        container.exth_header().map_or(0, |e| e.record_count())
    );
    book
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
