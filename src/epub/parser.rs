//! EPUB package parsing (container.xml and the OPF metadata block).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::util::resolve_entity;

/// A `dc:creator` or `dc:contributor` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpfCreator {
    pub id: Option<String>,
    pub name: String,
    pub role: Option<String>,
    pub file_as: Option<String>,
}

/// A `dc:identifier` entry with its scheme resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpfIdentifier {
    pub id: Option<String>,
    pub scheme: Option<String>,
    pub value: String,
}

/// Metadata of an OPF package document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpfMetadata {
    /// Package version, `2.0` or `3.0`.
    pub version: Option<String>,
    pub titles: Vec<String>,
    pub creators: Vec<OpfCreator>,
    pub contributors: Vec<OpfCreator>,
    pub identifiers: Vec<OpfIdentifier>,
    pub languages: Vec<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    /// Publication date as written.
    pub date: Option<String>,
    pub rights: Option<String>,
    pub series: Option<String>,
    pub series_index: Option<String>,
    /// `dcterms:modified`.
    pub modified: Option<String>,
    /// Cover image href, relative to the OPF file.
    pub cover_href: Option<String>,
    pub cover_media_type: Option<String>,
}

/// Attributes of interest on OPF elements, keyed by local name.
#[derive(Debug, Default)]
struct Attrs {
    id: Option<String>,
    role: Option<String>,
    file_as: Option<String>,
    scheme: Option<String>,
    event: Option<String>,
    name: Option<String>,
    content: Option<String>,
    property: Option<String>,
    properties: Option<String>,
    refines: Option<String>,
    href: Option<String>,
    media_type: Option<String>,
    version: Option<String>,
}

impl Attrs {
    fn from_element(e: &BytesStart<'_>) -> Self {
        let mut attrs = Attrs::default();
        for attr in e.attributes().flatten() {
            let value = Some(attr_value(&attr.value));
            match local_name(attr.key.as_ref()) {
                b"id" => attrs.id = value,
                b"role" => attrs.role = value,
                b"file-as" => attrs.file_as = value,
                b"scheme" => attrs.scheme = value,
                b"event" => attrs.event = value,
                b"name" => attrs.name = value,
                b"content" => attrs.content = value,
                b"property" => attrs.property = value,
                b"properties" => attrs.properties = value,
                b"refines" => attrs.refines = value,
                b"href" => attrs.href = value,
                b"media-type" => attrs.media_type = value,
                b"version" => attrs.version = value,
                _ => {}
            }
        }
        attrs
    }
}

struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
}

/// An EPUB 3 `<meta refines="#id">` statement about another element.
struct Refinement {
    target: String,
    property: String,
    value: String,
}

struct Collection {
    id: Option<String>,
    name: String,
    kind: Option<String>,
    position: Option<String>,
}

/// Element whose text is being collected.
struct Pending {
    local: Vec<u8>,
    attrs: Attrs,
}

/// State threaded through [`parse_opf`].
#[derive(Default)]
struct OpfBuilder {
    opf: OpfMetadata,
    manifest: Vec<ManifestItem>,
    epub2_cover_id: Option<String>,
    refinements: Vec<Refinement>,
    collections: Vec<Collection>,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                let attrs = e.attributes().flatten();
                for attr in attrs {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(attr_value(&attr.value));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::MissingElement("rootfile in container.xml".to_string()))
}

/// Parse the metadata and manifest of an OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfMetadata> {
    let mut reader = Reader::from_str(content);

    let mut builder = OpfBuilder::default();
    let mut in_metadata = false;
    let mut pending: Option<Pending> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"package" => builder.opf.version = Attrs::from_element(&e).version,
                    b"metadata" => in_metadata = true,
                    // OEB 1.x wrappers around the Dublin Core block
                    b"dc-metadata" | b"x-metadata" => {}
                    b"item" if !in_metadata => builder.manifest_item(Attrs::from_element(&e)),
                    _ if in_metadata && pending.is_none() => {
                        pending = Some(Pending {
                            local: local.to_vec(),
                            attrs: Attrs::from_element(&e),
                        });
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"meta" if in_metadata => builder.named_meta(Attrs::from_element(&e)),
                    b"item" => builder.manifest_item(Attrs::from_element(&e)),
                    _ => {}
                }
            }
            Event::Text(e) if pending.is_some() => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::CData(e) if pending.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) if pending.is_some() => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                // nested markup inside an element does not end it
                if pending.as_ref().is_some_and(|p| p.local == local)
                    && let Some(p) = pending.take()
                {
                    builder.element(&p.local, p.attrs, text.trim());
                    text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(builder.finish())
}

impl OpfBuilder {
    /// A `dc:*` or text-bearing `<meta>` element has closed.
    fn element(&mut self, local: &[u8], attrs: Attrs, value: &str) {
        if local == b"meta" {
            if attrs.name.is_some() {
                self.named_meta(attrs);
            } else {
                self.property_meta(attrs, value);
            }
            return;
        }
        if value.is_empty() {
            return;
        }

        let opf = &mut self.opf;
        match local {
            b"title" => opf.titles.push(value.to_string()),
            b"creator" | b"contributor" => {
                let creator = OpfCreator {
                    id: attrs.id,
                    name: value.to_string(),
                    role: attrs.role,
                    file_as: attrs.file_as,
                };
                if local == b"creator" {
                    opf.creators.push(creator);
                } else {
                    opf.contributors.push(creator);
                }
            }
            b"identifier" => {
                let (scheme, value) = identifier_scheme(attrs.scheme.as_deref(), value);
                opf.identifiers.push(OpfIdentifier {
                    id: attrs.id,
                    scheme,
                    value,
                });
            }
            b"language" => opf.languages.push(value.to_string()),
            b"publisher" => opf.publisher = Some(value.to_string()),
            b"description" => opf.description = Some(value.to_string()),
            b"subject" => opf.subjects.push(value.to_string()),
            b"date" => {
                // EPUB 2 may list several events; publication wins
                let is_publication = attrs
                    .event
                    .as_deref()
                    .is_none_or(|ev| ev.eq_ignore_ascii_case("publication"));
                if opf.date.is_none() || is_publication {
                    opf.date = Some(value.to_string());
                }
            }
            b"rights" => opf.rights = Some(value.to_string()),
            _ => {}
        }
    }

    /// EPUB 2 style `<meta name="..." content="..."/>`.
    fn named_meta(&mut self, attrs: Attrs) {
        let (Some(name), Some(content)) = (attrs.name, attrs.content) else {
            return;
        };
        match name.as_str() {
            "cover" => self.epub2_cover_id = Some(content),
            "calibre:series" => self.opf.series = Some(content),
            "calibre:series_index" => self.opf.series_index = Some(content),
            _ => {}
        }
    }

    /// EPUB 3 style `<meta property="...">value</meta>`.
    fn property_meta(&mut self, attrs: Attrs, value: &str) {
        let Some(property) = attrs.property else {
            return;
        };
        if let Some(target) = attrs.refines {
            self.refinements.push(Refinement {
                target: target.trim_start_matches('#').to_string(),
                property,
                value: value.to_string(),
            });
            return;
        }
        match property.as_str() {
            "belongs-to-collection" => self.collections.push(Collection {
                id: attrs.id,
                name: value.to_string(),
                kind: None,
                position: None,
            }),
            "dcterms:modified" => self.opf.modified = Some(value.to_string()),
            _ => {}
        }
    }

    fn manifest_item(&mut self, attrs: Attrs) {
        if let (Some(id), Some(href)) = (attrs.id, attrs.href) {
            self.manifest.push(ManifestItem {
                id,
                href,
                media_type: attrs.media_type.unwrap_or_default(),
                properties: attrs.properties,
            });
        }
    }

    fn finish(mut self) -> OpfMetadata {
        for r in std::mem::take(&mut self.refinements) {
            self.apply_refinement(r);
        }

        if self.opf.series.is_none()
            && let Some(c) = self
                .collections
                .iter()
                .find(|c| c.kind.as_deref().is_none_or(|k| k == "series"))
        {
            self.opf.series = Some(c.name.clone());
            self.opf.series_index = c.position.clone();
        }

        // EPUB 3 property first, then the EPUB 2 meta, then a conventional id
        let cover = self
            .manifest
            .iter()
            .find(|item| {
                item.properties
                    .as_deref()
                    .is_some_and(|p| p.split_ascii_whitespace().any(|p| p == "cover-image"))
            })
            .or_else(|| {
                let id = self.epub2_cover_id.as_deref()?;
                self.manifest.iter().find(|item| item.id == id)
            })
            .or_else(|| {
                self.manifest.iter().find(|item| {
                    item.id.eq_ignore_ascii_case("cover-image")
                        || (item.id.eq_ignore_ascii_case("cover")
                            && item.media_type.starts_with("image/"))
                })
            });
        if let Some(item) = cover {
            self.opf.cover_href = Some(item.href.clone());
            self.opf.cover_media_type =
                Some(item.media_type.clone()).filter(|m| m.starts_with("image/"));
        }

        self.opf
    }

    fn apply_refinement(&mut self, r: Refinement) {
        let target = Some(r.target.as_str());
        let creator = self
            .opf
            .creators
            .iter_mut()
            .chain(self.opf.contributors.iter_mut())
            .find(|c| c.id.as_deref() == target);
        if let Some(creator) = creator {
            match r.property.as_str() {
                "role" => creator.role = Some(r.value),
                "file-as" => creator.file_as = Some(r.value),
                _ => {}
            }
            return;
        }

        if let Some(c) = self.collections.iter_mut().find(|c| c.id.as_deref() == target) {
            match r.property.as_str() {
                "collection-type" => c.kind = Some(r.value),
                "group-position" => c.position = Some(r.value),
                _ => {}
            }
        }
    }
}

/// Work out an identifier's scheme from the `opf:scheme` attribute or a
/// `urn:` prefix. The returned value has the URN prefix removed.
fn identifier_scheme(attr: Option<&str>, value: &str) -> (Option<String>, String) {
    if let Some(rest) = value.strip_prefix("urn:")
        && let Some((scheme, id)) = rest.split_once(':')
    {
        return (Some(scheme.to_ascii_lowercase()), id.to_string());
    }
    if let Some(scheme) = attr {
        return (Some(scheme.to_ascii_lowercase()), value.to_string());
    }
    if let Some((scheme, id)) = value.split_once(':')
        && matches!(scheme.to_ascii_lowercase().as_str(), "isbn" | "uuid" | "asin" | "doi" | "calibre")
    {
        return (Some(scheme.to_ascii_lowercase()), id.trim().to_string());
    }
    (None, value.to_string())
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Decode a raw attribute value, resolving entity references.
fn attr_value(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    if !raw.contains('&') {
        return raw.into_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw.as_ref();
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').and_then(|semi| Some((resolve_entity(&after[..semi])?, semi))) {
            Some((resolved, semi)) => {
                out.push_str(&resolved);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
