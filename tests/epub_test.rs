mod common;

use bookmeta::{Ebook, Error, Format, ReadOptions, read_epub};
use common::{ALICE_OPF, CONTAINER_XML, JPEG, alice_epub, zip};
use tempfile::Builder;

#[test]
fn test_read_epub_metadata() {
    let book = Ebook::from_bytes(alice_epub()).unwrap();

    assert_eq!(book.format, Format::Epub);
    assert!(book.has_parser);
    assert_eq!(book.title.as_deref(), Some("Alice's Adventures in Wonderland"));

    let author = book.author_main().unwrap();
    assert_eq!(author.name, "Lewis Carroll");
    assert_eq!(author.role.as_deref(), Some("aut"));
    assert_eq!(author.file_as.as_deref(), Some("Carroll, Lewis"));
    // the book producer is not an author
    assert_eq!(book.authors.len(), 1);
    assert!(book.extras["producer"].starts_with("calibre"));

    assert_eq!(book.isbn(), Some("9780000000001"));
    assert_eq!(book.identifier("uuid"), Some("0b1c2d3e-0000-4000-8000-000000000000"));
    assert_eq!(book.language.as_deref(), Some("en"));
    assert_eq!(book.publisher.as_deref(), Some("Macmillan"));
    assert_eq!(book.tags, vec!["Fantasy"]);
    assert_eq!(book.series.as_deref(), Some("Alice"));
    assert_eq!(book.volume, Some(1.0));
    assert_eq!(
        book.publish_date.map(|d| d.format("%Y-%m-%d").to_string()).as_deref(),
        Some("1865-11-26")
    );
    assert_eq!(book.extras["epub_version"], "2.0");
}

#[test]
fn test_epub_cover() {
    let book = Ebook::from_bytes(alice_epub()).unwrap();
    let cover = book.cover.unwrap();
    assert_eq!(cover.media_type, "image/jpeg");
    assert_eq!(cover.data, JPEG);

    let book = Ebook::from_bytes_with(alice_epub(), &ReadOptions::without_cover()).unwrap();
    assert!(book.cover.is_none());
}

#[test]
fn test_missing_cover_file_is_tolerated() {
    let data = zip(&[
        ("mimetype", b"application/epub+zip".as_slice()),
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", ALICE_OPF.as_bytes()),
    ]);
    let book = Ebook::from_bytes(data).unwrap();
    assert!(book.cover.is_none());
    assert_eq!(book.title.as_deref(), Some("Alice's Adventures in Wonderland"));
}

#[test]
fn test_epub_without_mimetype_first() {
    // not sniffable as EPUB, but the container document gives it away
    let data = zip(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", ALICE_OPF.as_bytes()),
    ]);
    let book = Ebook::from_bytes(data).unwrap();
    assert_eq!(book.format, Format::Epub);
    assert_eq!(book.author_main().unwrap().name, "Lewis Carroll");
}

#[test]
fn test_missing_container_is_error() {
    let data = zip(&[
        ("mimetype", b"application/epub+zip".as_slice()),
        ("content.opf", ALICE_OPF.as_bytes()),
    ]);
    let err = bookmeta::epub::read_metadata(&data, &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MissingElement(_)), "{err:?}");
}

#[test]
fn test_read_epub_from_path() {
    let mut file = Builder::new().suffix(".epub").tempfile().unwrap();
    std::io::Write::write_all(&mut file, &alice_epub()).unwrap();

    let book = read_epub(file.path()).unwrap();
    assert_eq!(book.path.as_deref(), Some(file.path()));

    let book = Ebook::read(file.path()).unwrap();
    assert_eq!(book.format, Format::Epub);
    assert_eq!(book.series.as_deref(), Some("Alice"));
}
