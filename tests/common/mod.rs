//! In-memory fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// A sentence of exactly 20 visible characters.
pub const TWENTY: &str = "aaaa bbbb cccc dddd.";

/// Wrap body markup in a minimal XHTML document.
pub fn xhtml(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    )
}

/// `count` paragraphs of [`TWENTY`].
pub fn paragraphs(count: usize) -> String {
    (0..count).map(|_| format!("<p>{TWENTY}</p>\n")).collect()
}

/// Build an EPUB 2 package under `OEBPS/`.
///
/// `chapters` are `(href, xhtml)` pairs in spine order. When `nav_points` is
/// given an NCX is written and referenced from the spine; each point is a
/// `(label, src)` pair relative to `OEBPS/`.
pub fn epub(title: &str, chapters: &[(&str, String)], nav_points: Option<&[(&str, &str)]>) -> Vec<u8> {
    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, (href, _)) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            r#"<item id="ch{i}" href="{href}" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
    }
    let spine_toc = if nav_points.is_some() {
        manifest.push_str(r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#);
        r#" toc="ncx""#
    } else {
        ""
    };

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>Test Author</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine{spine_toc}>{spine}</spine>
</package>"#
    );

    let mut entries: Vec<(String, String)> = vec![
        (
            "META-INF/container.xml".into(),
            r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#
                .into(),
        ),
        ("OEBPS/content.opf".into(), opf),
    ];
    if let Some(points) = nav_points {
        entries.push(("OEBPS/toc.ncx".into(), ncx(points)));
    }
    for (href, body) in chapters {
        entries.push((format!("OEBPS/{href}"), body.clone()));
    }

    zip_entries(&entries)
}

fn ncx(points: &[(&str, &str)]) -> String {
    let nav: String = points
        .iter()
        .enumerate()
        .map(|(i, (label, src))| {
            format!(
                r#"<navPoint id="np{i}" playOrder="{}"><navLabel><text>{label}</text></navLabel><content src="{src}"/></navPoint>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head/>
  <docTitle><text>Test</text></docTitle>
  <navMap>{nav}</navMap>
</ncx>"#
    )
}

/// Zip `(name, content)` pairs, storing the `mimetype` entry first.
pub fn zip_entries(entries: &[(String, String)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    for (name, content) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Wrap FictionBook body markup in a document with a title-info block.
pub fn fb2(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
  <description>
    <title-info>
      <author><first-name>Lev</first-name><last-name>Tolstoy</last-name></author>
      <book-title>{title}</book-title>
      <lang>ru</lang>
    </title-info>
  </description>
  <body>
{body}
  </body>
</FictionBook>"#
    )
}
