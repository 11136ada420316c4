use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::book::{BookAuthor, Ebook, EbookCover, ReadOptions};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::util::{decode_text, detect_image_type, image_type_for_path, normalize_whitespace, parse_date};

use super::parser::{OpfMetadata, parse_container_xml, parse_opf, strip_bom};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Read EPUB metadata from a file on disk.
///
/// # Example
///
/// ```no_run
/// use bookmeta::epub::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("Title: {:?}", book.title);
/// # Ok::<(), bookmeta::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Ebook> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let mut book = read_metadata(&data, &ReadOptions::default())?;
    book.path = Some(path.to_path_buf());
    Ok(book)
}

/// Read EPUB metadata from an in-memory archive.
pub fn read_metadata(data: &[u8], options: &ReadOptions) -> Result<Ebook> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let container = match read_archive_file_bytes(&mut archive, CONTAINER_PATH) {
        Err(Error::Zip(ZipError::FileNotFound)) => {
            return Err(Error::MissingElement(CONTAINER_PATH.to_string()));
        }
        other => other?,
    };
    let opf_path = parse_container_xml(&container)?;
    let opf_dir = opf_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    let opf_bytes = read_archive_file_bytes(&mut archive, &opf_path)
        .map_err(|e| Error::InvalidEpub(format!("cannot read package {opf_path}: {e}")))?;
    let opf_text = decode_text(strip_bom(&opf_bytes), None);
    let opf = parse_opf(&opf_text)?;

    let cover = if options.with_cover {
        opf.cover_href
            .as_deref()
            .and_then(|href| read_cover(&mut archive, opf_dir, href, opf.cover_media_type.as_deref()))
    } else {
        None
    };

    let mut book = to_ebook(opf);
    book.cover = cover;
    Ok(book)
}

/// Whether `data` is a zip archive holding an EPUB container document.
pub fn is_epub_archive(data: &[u8]) -> bool {
    ZipArchive::new(Cursor::new(data))
        .is_ok_and(|archive| archive.index_for_name(CONTAINER_PATH).is_some())
}

/// Map OPF metadata onto the book model.
pub fn to_ebook(opf: OpfMetadata) -> Ebook {
    let mut book = Ebook::new(Format::Epub);

    book.title = opf.titles.first().map(|t| normalize_whitespace(t));
    for creator in opf.creators {
        book.authors.push(author(creator.name, creator.role, creator.file_as));
    }
    for contributor in opf.contributors {
        // book producer, usually the conversion tool
        if contributor.role.as_deref() == Some("bkp") {
            book.push_extra("producer", contributor.name);
            continue;
        }
        let role = contributor.role.or_else(|| Some("ctb".to_string()));
        book.authors.push(author(contributor.name, role, contributor.file_as));
    }

    for id in &opf.identifiers {
        book.push_identifier(id.scheme.as_deref(), &id.value);
    }

    let mut languages = opf.languages.into_iter();
    book.language = languages.next();
    let others: Vec<String> = languages.collect();
    if !others.is_empty() {
        book.push_extra("languages", others.join(", "));
    }

    book.publisher = opf.publisher;
    book.description = opf.description;
    book.tags = opf.subjects;
    book.copyright = opf.rights;

    if let Some(date) = opf.date {
        book.publish_date = parse_date(&date);
        if book.publish_date.is_none() {
            log::warn!("unparseable EPUB date {date:?}");
            book.push_extra("date", date);
        }
    }

    book.series = opf.series;
    book.volume = opf.series_index.as_deref().and_then(|i| i.trim().parse().ok());

    if let Some(version) = opf.version {
        book.push_extra("epub_version", version);
    }
    if let Some(modified) = opf.modified {
        book.push_extra("modified", modified);
    }
    book
}

fn author(name: String, role: Option<String>, file_as: Option<String>) -> BookAuthor {
    let mut author = BookAuthor::new(normalize_whitespace(&name));
    author.role = role;
    author.file_as = file_as;
    author
}

fn read_cover<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    opf_dir: &str,
    href: &str,
    declared_type: Option<&str>,
) -> Option<EbookCover> {
    let path = resolve_path(opf_dir, href);
    match read_archive_file_bytes(archive, &path) {
        Ok(data) => {
            let media_type = declared_type
                .or_else(|| detect_image_type(&data))
                .or_else(|| image_type_for_path(&path))?;
            Some(EbookCover {
                media_type: media_type.to_string(),
                data,
            })
        }
        Err(e) => {
            log::warn!("cover {path} is not readable: {e}");
            None
        }
    }
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    // Try direct lookup first
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: try percent-decoded path (handles malformed EPUBs)
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {}", path)))?;

    let mut file = archive.by_name(&decoded)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Join an href onto the OPF directory, resolving `.` and `..` segments and
/// dropping any fragment.
fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}
