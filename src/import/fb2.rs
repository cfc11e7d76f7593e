//! FictionBook 2 importer.
//!
//! FB2 is a single XML document:
//! - `<description>`: metadata (`title-info` holds title, authors, language)
//! - `<body>`: main content as nested `<section>`s, each with an optional `<title>`
//! - `<body name="notes">`: footnotes, one section per note
//! - `<binary>`: base64 images, skipped
//!
//! The main body becomes one content unit per top-level section, preceded by
//! a preface unit for anything before the first section. Notes sections
//! follow as separate units. Section titles of the main body form the native
//! table of contents; malformed input keeps everything parsed before the error.

use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::EngineConfig;
use crate::epub::ZipIndex;
use crate::error::{Error, Result};
use crate::import::{
    ContentUnit, ImportedBook, Importer, Metadata, NativeToc, SectionTitle, UnitBody,
    title_from_file_name,
};
use crate::io::ByteSource;
use crate::markup::strip_tags;
use crate::util::{
    collapse_whitespace, decode_entities, decode_text, escape_html, extract_xml_encoding, local_name,
    resolve_entity,
};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub struct Fb2Importer {
    metadata: Metadata,
    units: Vec<ContentUnit>,
    titles: Vec<SectionTitle>,
    native_toc: NativeToc,
}

impl Importer for Fb2Importer {
    fn open(source: Arc<dyn ByteSource>, file_name: Option<&str>, config: &EngineConfig) -> Result<Self> {
        let bytes = load_fb2_bytes(source)?;
        let xml = decode_text(&bytes, extract_xml_encoding(&bytes), &config.fallback_encoding);

        let mut importer = Self::from_xml(&xml);
        if importer.metadata.title.is_empty() {
            importer.metadata.title = title_from_file_name(file_name);
        }
        Ok(importer)
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    fn native_toc(&self) -> &NativeToc {
        &self.native_toc
    }

    fn into_book(self) -> ImportedBook {
        ImportedBook {
            metadata: self.metadata,
            units: self.units,
            native_toc: self.native_toc,
        }
    }
}

impl Fb2Importer {
    /// Convert decoded FB2 XML.
    pub fn from_xml(xml: &str) -> Self {
        let mut converter = Converter::default();
        converter.run(xml);

        let titles = converter.titles;
        let native_toc = if titles.is_empty() {
            NativeToc::None
        } else {
            NativeToc::Sections(titles.clone())
        };

        Self {
            metadata: converter.metadata,
            units: converter.units,
            titles,
            native_toc,
        }
    }

    /// Main-body section titles, in document order.
    pub fn section_titles(&self) -> &[SectionTitle] {
        &self.titles
    }
}

/// Read the FB2 document, unpacking `.fb2.zip` archives.
fn load_fb2_bytes(source: Arc<dyn ByteSource>) -> Result<Vec<u8>> {
    let head_len = source.len().min(ZIP_MAGIC.len() as u64) as usize;
    if source.read_at(0, head_len)? != ZIP_MAGIC {
        return Ok(source.read_all()?);
    }

    let zip = ZipIndex::new(source)?;
    let name = zip
        .names()
        .find(|name| name.to_ascii_lowercase().ends_with(".fb2"))
        .map(str::to_string)
        .ok_or_else(|| Error::UnsupportedFormat("ZIP archive holds no .fb2 document".to_string()))?;

    log::debug!("reading {name} from FB2 archive");
    Ok(zip.read(&name)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Main,
    Notes,
}

/// What to do when an element ends.
#[derive(Debug, Clone, Copy)]
enum Closer {
    Nothing,
    Tag(&'static str),
    Section,
    Title,
    Body,
    Author,
}

struct Frame {
    name: String,
    closer: Closer,
}

struct UnitBuilder {
    href: String,
    title: Option<String>,
    markup: String,
}

struct TitleState {
    level: usize,
    heading: &'static str,
    text: String,
    lines: usize,
}

#[derive(Default)]
struct Converter {
    metadata: Metadata,
    units: Vec<ContentUnit>,
    titles: Vec<SectionTitle>,

    stack: Vec<Frame>,
    skip_depth: usize,
    author: Vec<String>,

    body: Option<BodyKind>,
    section_depth: usize,
    unit_count: usize,
    unit: Option<UnitBuilder>,
    title: Option<TitleState>,
}

impl Converter {
    fn run(&mut self, xml: &str) {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => self.start(&e, false),
                Ok(Event::Empty(e)) => self.start(&e, true),
                Ok(Event::End(_)) => self.end(),
                Ok(Event::Text(e)) => self.text(&String::from_utf8_lossy(e.as_ref())),
                Ok(Event::CData(e)) => self.text(&String::from_utf8_lossy(e.as_ref())),
                Ok(Event::GeneralRef(e)) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        self.text(&resolved);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!(
                        "FB2 parse stopped at byte {}: {e}; keeping content read so far",
                        reader.buffer_position()
                    );
                    break;
                }
                _ => {}
            }
        }

        self.finish_unit();
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        if self.skip_depth > 0 {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }

        let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();

        let closer = if self.body.is_some() {
            self.start_content(&name, e, empty)
        } else {
            match name.as_str() {
                "binary" => {
                    if !empty {
                        self.skip_depth = 1;
                    }
                    return;
                }
                "body" if !empty => {
                    self.body = Some(body_kind(e));
                    self.section_depth = 0;
                    Closer::Body
                }
                "author" if self.in_element("title-info") => {
                    self.author.clear();
                    Closer::Author
                }
                _ => Closer::Nothing,
            }
        };

        if !empty {
            self.stack.push(Frame { name, closer });
        }
    }

    /// Open a body element, returning how to close it.
    fn start_content(&mut self, name: &str, e: &BytesStart<'_>, empty: bool) -> Closer {
        match name {
            "section" => {
                if empty {
                    return Closer::Nothing;
                }
                self.section_depth += 1;
                if self.section_depth == 1 {
                    self.start_unit(attr(e, b"id"));
                }
                self.emit_open("div", Some("section"), e);
                Closer::Section
            }
            "title" if !empty => {
                let level = self.section_depth;
                let heading = heading_for(level);
                self.emit(&format!("<{heading} class=\"title\">"));
                self.title = Some(TitleState {
                    level,
                    heading,
                    text: String::new(),
                    lines: 0,
                });
                Closer::Title
            }
            "p" if self.title.is_some() => {
                if let Some(title) = self.title.as_mut() {
                    if title.lines > 0 {
                        title.text.push(' ');
                    }
                    title.lines += 1;
                    if title.lines > 1 {
                        self.emit("<br/>");
                    }
                }
                Closer::Nothing
            }
            "empty-line" => {
                self.emit("<br/>");
                Closer::Nothing
            }
            "image" => {
                let src = attr(e, b"href").unwrap_or_default();
                self.emit(&format!("<img src=\"{}\" alt=\"\"/>", escape_attr(&src)));
                Closer::Nothing
            }
            "a" => {
                let href = attr(e, b"href").unwrap_or_default();
                let is_note = attr(e, b"type").is_some_and(|t| t == "note");
                let class = if is_note { " class=\"note-ref\"" } else { "" };
                self.emit(&format!("<a href=\"{}\"{class}>", escape_attr(&href)));
                self.close_if_empty("a", empty)
            }
            _ => match html_mapping(name) {
                Some((tag, class)) => {
                    self.emit_open(tag, class, e);
                    self.close_if_empty(tag, empty)
                }
                None => Closer::Nothing,
            },
        }
    }

    fn close_if_empty(&mut self, tag: &'static str, empty: bool) -> Closer {
        if empty {
            self.emit(&format!("</{tag}>"));
            Closer::Nothing
        } else {
            Closer::Tag(tag)
        }
    }

    fn end(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame.closer {
            Closer::Nothing => {}
            Closer::Tag(tag) => self.emit(&format!("</{tag}>")),
            Closer::Section => {
                self.emit("</div>");
                self.section_depth = self.section_depth.saturating_sub(1);
                if self.section_depth == 0 {
                    self.finish_unit();
                }
            }
            Closer::Title => self.end_title(),
            Closer::Body => {
                self.finish_unit();
                self.body = None;
            }
            Closer::Author => {
                let author = collapse_whitespace(&self.author.join(" "));
                if !author.is_empty() {
                    self.metadata.authors.push(author);
                }
            }
        }
    }

    fn end_title(&mut self) {
        let Some(title) = self.title.take() else {
            return;
        };
        self.emit(&format!("</{}>", title.heading));

        let text = collapse_whitespace(&title.text);
        if text.is_empty() {
            return;
        }
        if let Some(unit) = self.unit.as_mut()
            && unit.title.is_none()
        {
            unit.title = Some(text.clone());
        }
        if self.body == Some(BodyKind::Main) && title.level >= 1 {
            self.titles.push(SectionTitle {
                title: text,
                level: title.level,
            });
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }

        if self.body.is_some() {
            if self.unit.is_none() && text.trim().is_empty() {
                return;
            }
            if let Some(title) = self.title.as_mut() {
                title.text.push_str(text);
            }
            self.emit(&escape_html(text));
            return;
        }

        match self.stack.last().map(|f| f.name.as_str()) {
            Some("book-title") if self.in_element("title-info") => self.metadata.title.push_str(text),
            Some("lang") if self.in_element("title-info") => self.metadata.language.push_str(text.trim()),
            Some("first-name" | "middle-name" | "last-name" | "nickname")
                if self.in_element("author") =>
            {
                self.author.push(text.to_string())
            }
            _ => {}
        }
    }

    fn in_element(&self, name: &str) -> bool {
        self.stack.iter().any(|frame| frame.name == name)
    }

    fn emit(&mut self, markup: &str) {
        if self.unit.is_none() {
            let href = match self.body {
                Some(BodyKind::Notes) => format!("notes-{}", self.unit_count),
                _ if self.unit_count == 0 => "preface".to_string(),
                _ => format!("interlude-{}", self.unit_count),
            };
            self.unit_count += 1;
            self.unit = Some(UnitBuilder {
                href,
                title: None,
                markup: String::new(),
            });
        }
        if let Some(unit) = self.unit.as_mut() {
            unit.markup.push_str(markup);
        }
    }

    fn emit_open(&mut self, tag: &str, class: Option<&str>, e: &BytesStart<'_>) {
        let mut open = format!("<{tag}");
        if let Some(class) = class {
            open.push_str(&format!(" class=\"{class}\""));
        }
        if let Some(id) = attr(e, b"id") {
            open.push_str(&format!(" id=\"{}\"", escape_attr(&id)));
        }
        open.push('>');
        self.emit(&open);
    }

    fn start_unit(&mut self, id: Option<String>) {
        self.finish_unit();
        let href = id.unwrap_or_else(|| format!("section-{}", self.unit_count));
        self.unit_count += 1;
        self.unit = Some(UnitBuilder {
            href,
            title: None,
            markup: String::new(),
        });
    }

    /// Close the current unit, dropping it when it shows nothing.
    fn finish_unit(&mut self) {
        let Some(unit) = self.unit.take() else {
            return;
        };
        if strip_tags(&unit.markup).trim().is_empty() && !unit.markup.contains("<img") {
            return;
        }
        self.units.push(ContentUnit {
            href: unit.href,
            title: unit.title,
            body: UnitBody::Markup(unit.markup),
        });
    }
}

fn body_kind(e: &BytesStart<'_>) -> BodyKind {
    match attr(e, b"name").as_deref() {
        Some("notes" | "comments" | "footnotes") => BodyKind::Notes,
        _ => BodyKind::Main,
    }
}

fn heading_for(level: usize) -> &'static str {
    match level {
        0 | 1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}

/// HTML element (and class) for an FB2 element with a direct counterpart.
fn html_mapping(name: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapped = match name {
        "p" => ("p", None),
        "emphasis" => ("em", None),
        "strong" => ("strong", None),
        "strikethrough" => ("s", None),
        "sub" => ("sub", None),
        "sup" => ("sup", None),
        "code" => ("code", None),
        "epigraph" => ("blockquote", Some("epigraph")),
        "cite" => ("blockquote", Some("cite")),
        "annotation" => ("div", Some("annotation")),
        "poem" => ("div", Some("poem")),
        "stanza" => ("div", Some("stanza")),
        "v" => ("p", Some("verse")),
        "text-author" => ("p", Some("text-author")),
        "subtitle" => ("p", Some("subtitle")),
        "table" => ("table", None),
        "tr" => ("tr", None),
        "td" => ("td", None),
        "th" => ("th", None),
        _ => return None,
    };
    Some(mapped)
}

/// Attribute by local name, so `l:href` and `xlink:href` both match `href`.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == key)
        .map(|a| decode_entities(&String::from_utf8_lossy(&a.value)).into_owned())
}

fn escape_attr(value: &str) -> String {
    escape_html(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
  <description>
    <title-info>
      <author><first-name>Leo</first-name><last-name>Tolstoy</last-name></author>
      <book-title>War &amp; Peace</book-title>
      <lang>ru</lang>
    </title-info>
  </description>
  <body>
    <title><p>War and Peace</p></title>
    <epigraph><p>Motto</p></epigraph>
    <section id="part1">
      <title><p>Part One</p></title>
      <section>
        <title><p>Chapter I</p><p>Salon</p></title>
        <p>Well, <emphasis>Prince</emphasis>, so Genoa<a l:href="#n1" type="note">1</a>.</p>
        <empty-line/>
        <image l:href="#pic.jpg"/>
      </section>
      <section>
        <title><p>Chapter II</p></title>
        <p>Anna Pavlovna.</p>
      </section>
    </section>
    <section>
      <title><p>Part Two</p></title>
      <p>Text.</p>
    </section>
  </body>
  <body name="notes">
    <title><p>Notes</p></title>
    <section id="n1"><title><p>1</p></title><p>A note.</p></section>
  </body>
  <binary id="pic.jpg" content-type="image/jpeg">AAAA</binary>
</FictionBook>"##;

    #[test]
    fn test_metadata() {
        let importer = Fb2Importer::from_xml(BOOK);
        let meta = importer.metadata();
        assert_eq!(meta.title, "War & Peace");
        assert_eq!(meta.authors, vec!["Leo Tolstoy"]);
        assert_eq!(meta.language, "ru");
    }

    #[test]
    fn test_units_per_top_level_section() {
        let importer = Fb2Importer::from_xml(BOOK);
        let hrefs: Vec<_> = importer.units().iter().map(|u| u.href.as_str()).collect();
        assert_eq!(hrefs, vec!["preface", "part1", "section-2", "notes-3", "n1"]);
        assert_eq!(importer.units()[0].title.as_deref(), Some("War and Peace"));
        assert_eq!(importer.units()[1].title.as_deref(), Some("Part One"));
    }

    #[test]
    fn test_section_titles_and_levels() {
        let importer = Fb2Importer::from_xml(BOOK);
        let titles: Vec<_> = importer
            .section_titles()
            .iter()
            .map(|t| (t.title.as_str(), t.level))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("Part One", 1),
                ("Chapter I Salon", 2),
                ("Chapter II", 2),
                ("Part Two", 1),
            ]
        );
    }

    #[test]
    fn test_element_mapping() {
        let importer = Fb2Importer::from_xml(BOOK);
        let UnitBody::Markup(markup) = &importer.units()[1].body else {
            panic!("expected markup");
        };
        assert!(markup.starts_with(r#"<div class="section" id="part1">"#));
        assert!(markup.contains(r#"<h1 class="title">Part One</h1>"#));
        assert!(markup.contains(r#"<h2 class="title">Chapter I<br/>Salon</h2>"#));
        assert!(markup.contains("<em>Prince</em>"));
        assert!(markup.contains(r##"<a href="#n1" class="note-ref">1</a>"##));
        assert!(markup.contains(r##"<img src="#pic.jpg" alt=""/>"##));
        assert!(!markup.contains("AAAA"));
    }

    #[test]
    fn test_truncated_document_keeps_parsed_content() {
        let xml = "<FictionBook><body><section><title><p>Only</p></title><p>Kept text</p></section><section><p>Cut";
        let importer = Fb2Importer::from_xml(xml);
        assert!(!importer.units().is_empty());
        let UnitBody::Markup(markup) = &importer.units()[0].body else {
            panic!("expected markup");
        };
        assert!(markup.contains("Kept text"));
    }

    #[test]
    fn test_windows_1251_document() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(
            "<?xml version=\"1.0\" encoding=\"windows-1251\"?><FictionBook><body><section><title><p>Глава</p></title><p>Текст</p></section></body></FictionBook>",
        );
        let source: Arc<dyn ByteSource> = Arc::new(crate::io::MemorySource::new(encoded.into_owned()));
        let importer = Fb2Importer::open(source, Some("book.fb2"), &EngineConfig::default()).unwrap();
        assert_eq!(importer.section_titles()[0].title, "Глава");
        assert_eq!(importer.metadata().title, "book");
    }
}
