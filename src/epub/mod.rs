//! EPUB metadata: `META-INF/container.xml` locates the OPF package, whose
//! `<metadata>` block and manifest supply the bibliographic fields and cover.

mod parser;
mod reader;

pub use parser::{OpfCreator, OpfIdentifier, OpfMetadata, parse_container_xml, parse_opf};
pub use reader::{is_epub_archive, read_epub, read_metadata, to_ebook};
