//! EPUB parsing utilities (container.xml, OPF, NCX, EPUB 3 nav)

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::import::Metadata;
use crate::markup::{Token, tokenize};
use crate::util::{collapse_whitespace, decode_entities, local_name, resolve_entity, strip_bom};

/// One manifest `<item>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == property))
    }

    /// True for spine items the engine can paginate.
    pub fn is_html(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html" | "application/html" | "text/x-oeb1-document"
        ) || (self.media_type.is_empty() && is_html_path(&self.href))
    }
}

/// Parsed OPF package data.
#[derive(Debug, Default)]
pub struct OpfData {
    pub metadata: Metadata,
    /// Maps manifest id -> item
    pub manifest: HashMap<String, ManifestItem>,
    pub spine_ids: Vec<String>,
    /// Href of the NCX named by `<spine toc="...">`, relative to the OPF.
    pub ncx_href: Option<String>,
    /// Href of the EPUB 3 navigation document, relative to the OPF.
    pub nav_href: Option<String>,
}

/// A flattened navigation entry, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub title: String,
    /// Target as written, possibly with a `#fragment`.
    pub src: String,
    /// Nesting depth, starting at 1.
    pub level: usize,
}

/// True for archive paths that look like (X)HTML content.
pub fn is_html_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr_value(&e, b"full-path")
                    && !path.is_empty()
                {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::ManifestNotFound(
        "no rootfile found in container.xml".to_string(),
    ))
}

/// Parse OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut opf = OpfData::default();
    let mut toc_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => current_element = Some("title"),
                    b"creator" if in_metadata => current_element = Some("creator"),
                    b"language" if in_metadata => current_element = Some("language"),
                    b"spine" => toc_id = attr_value(&e, b"toc"),
                    b"item" => insert_item(&mut opf.manifest, &e),
                    _ => {}
                }
                if current_element.is_some() {
                    buf_text.clear();
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => insert_item(&mut opf.manifest, &e),
                    b"itemref" => {
                        if let Some(idref) = attr_value(&e, b"idref") {
                            opf.spine_ids.push(idref);
                        }
                    }
                    b"spine" => toc_id = attr_value(&e, b"toc"),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some(elem) = current_element.take() {
                    let value = collapse_whitespace(&buf_text);
                    match elem {
                        "title" if opf.metadata.title.is_empty() => opf.metadata.title = value,
                        "creator" if !value.is_empty() => opf.metadata.authors.push(value),
                        "language" if opf.metadata.language.is_empty() => {
                            opf.metadata.language = value
                        }
                        _ => {}
                    }
                    buf_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    opf.ncx_href = toc_id
        .and_then(|id| opf.manifest.get(&id))
        .or_else(|| {
            opf.manifest
                .values()
                .find(|item| item.media_type == "application/x-dtbncx+xml")
        })
        .map(|item| item.href.clone());

    opf.nav_href = opf
        .manifest
        .values()
        .find(|item| item.has_property("nav"))
        .map(|item| item.href.clone());

    Ok(opf)
}

fn insert_item(manifest: &mut HashMap<String, ManifestItem>, e: &BytesStart<'_>) {
    let mut id = String::new();
    let mut item = ManifestItem {
        href: String::new(),
        media_type: String::new(),
        properties: None,
    };

    for attr in e.attributes().flatten() {
        let value = decode_entities(&String::from_utf8_lossy(&attr.value)).into_owned();
        match attr.key.as_ref() {
            b"id" => id = value,
            b"href" => item.href = value,
            b"media-type" => item.media_type = value.to_ascii_lowercase(),
            b"properties" => item.properties = Some(value),
            _ => {}
        }
    }

    if !id.is_empty() && !item.href.is_empty() {
        manifest.insert(id, item);
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| decode_entities(&String::from_utf8_lossy(&attr.value)).into_owned())
}

/// Parse NCX table of contents into a depth-first list.
pub fn parse_ncx(content: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    struct NavPointState {
        text: String,
        src: Option<String>,
        /// Position reserved in the output so parents precede children.
        slot: usize,
    }

    let mut slots: Vec<Option<NavPoint>> = Vec::new();
    let mut stack: Vec<NavPointState> = Vec::new();
    let mut in_label = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    stack.push(NavPointState {
                        text: String::new(),
                        src: None,
                        slot: slots.len(),
                    });
                    slots.push(None);
                }
                b"navLabel" => in_label = true,
                b"text" if in_label => in_text = true,
                b"content" => {
                    if let Some(state) = stack.last_mut() {
                        state.src = attr_value(&e, b"src");
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content"
                    && let Some(state) = stack.last_mut()
                    && state.src.is_none()
                {
                    state.src = attr_value(&e, b"src");
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    state.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text
                    && let Some(state) = stack.last_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    state.text.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navLabel" => in_label = false,
                b"navPoint" => {
                    let level = stack.len();
                    if let Some(state) = stack.pop()
                        && let Some(src) = state.src
                    {
                        slots[state.slot] = Some(NavPoint {
                            title: collapse_whitespace(&state.text),
                            src,
                            level,
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("NCX parse stopped early: {e}");
                break;
            }
            _ => {}
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Parse the `<nav epub:type="toc">` list of an EPUB 3 navigation document.
///
/// Uses the lenient tokenizer, so documents that are not well-formed XML
/// still yield whatever links they contain.
pub fn parse_nav_document(content: &str) -> Vec<NavPoint> {
    let mut points = Vec::new();
    let mut nav_depth = 0usize;
    let mut list_depth = 0usize;
    let mut current: Option<(String, String)> = None;

    for token in tokenize(content) {
        match token {
            Token::Start(tag) if tag.name == "nav" && !tag.self_closing => {
                if nav_depth > 0 {
                    nav_depth += 1;
                } else if tag
                    .attr("epub:type")
                    .is_some_and(|t| t.split_ascii_whitespace().any(|t| t == "toc"))
                {
                    nav_depth = 1;
                }
            }
            Token::End(tag) if tag.name == "nav" && nav_depth > 0 => {
                nav_depth -= 1;
                if nav_depth == 0 {
                    break;
                }
            }
            _ if nav_depth == 0 => {}
            Token::Start(tag) if tag.name == "ol" || tag.name == "ul" => list_depth += 1,
            Token::End(tag) if tag.name == "ol" || tag.name == "ul" => {
                list_depth = list_depth.saturating_sub(1)
            }
            Token::Start(tag) if tag.name == "a" && list_depth > 0 => {
                let href = tag.attr("href").map(decode_entities).unwrap_or_default();
                current = Some((href.into_owned(), String::new()));
            }
            Token::Text(text) => {
                if let Some((_, title)) = current.as_mut() {
                    title.push_str(&decode_entities(text));
                }
            }
            Token::End(tag) if tag.name == "a" => {
                if let Some((src, title)) = current.take()
                    && !src.is_empty()
                {
                    points.push(NavPoint {
                        title: collapse_whitespace(&title),
                        src,
                        level: list_depth.max(1),
                    });
                }
            }
            _ => {}
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

        assert_eq!(parse_container_xml(container).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_parse_container_xml_with_bom() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#,
        );

        assert_eq!(parse_container_xml(&container).unwrap(), "content.opf");
    }

    #[test]
    fn test_parse_container_xml_without_rootfile() {
        let err = parse_container_xml(b"<container><rootfiles/></container>").unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound(_)));
    }

    #[test]
    fn test_parse_opf() {
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test &amp; Book</dc:title>
    <dc:creator>Author One</dc:creator>
    <dc:creator>Author Two</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="chapter1" href="text/chapter%201.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover" href="cover.jpg" media-type="image/jpeg"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="cover"/>
    <itemref idref="chapter1"/>
  </spine>
</package>"#;

        let result = parse_opf(opf).unwrap();

        assert_eq!(result.metadata.title, "Test & Book");
        assert_eq!(result.metadata.authors, vec!["Author One", "Author Two"]);
        assert_eq!(result.metadata.language, "en");
        assert_eq!(result.spine_ids, vec!["cover", "chapter1"]);
        assert_eq!(result.ncx_href.as_deref(), Some("toc.ncx"));
        assert_eq!(result.nav_href.as_deref(), Some("nav.xhtml"));
        assert!(result.manifest["chapter1"].is_html());
        assert!(!result.manifest["cover"].is_html());
    }

    #[test]
    fn test_parse_ncx_nested() {
        let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>Ignored</text></docTitle>
  <navMap>
    <navPoint id="part1" playOrder="1">
      <navLabel><text>Part I</text></navLabel>
      <content src="part1.xhtml"/>
      <navPoint id="ch1" playOrder="2">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="ch1.xhtml#start"/>
      </navPoint>
    </navPoint>
    <navPoint id="ch2" playOrder="3">
      <navLabel><text>Chapter
        2</text></navLabel>
      <content src="ch2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

        let points = parse_ncx(ncx).unwrap();
        let summary: Vec<_> = points
            .iter()
            .map(|p| (p.title.as_str(), p.src.as_str(), p.level))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Part I", "part1.xhtml", 1),
                ("Chapter 1", "ch1.xhtml#start", 2),
                ("Chapter 2", "ch2.xhtml", 1),
            ]
        );
    }

    #[test]
    fn test_parse_nav_document() {
        let nav = r#"<html><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<nav epub:type="toc" id="toc"><h1>Contents</h1>
  <ol>
    <li><a href="one.xhtml">One</a>
      <ol><li><a href="one.xhtml#s1">One &amp; a half</a></li></ol>
    </li>
    <li><a href="two.xhtml"><span>Two</span></a></li>
  </ol>
</nav></body></html>"#;

        let points = parse_nav_document(nav);
        let summary: Vec<_> = points
            .iter()
            .map(|p| (p.title.as_str(), p.src.as_str(), p.level))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("One", "one.xhtml", 1),
                ("One & a half", "one.xhtml#s1", 2),
                ("Two", "two.xhtml", 1),
            ]
        );
    }
}
