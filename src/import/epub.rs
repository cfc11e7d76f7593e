//! EPUB format importer - handles all IO.

use std::io;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::epub::{
    NavPoint, OpfData, ZipIndex, is_html_path, parse_container_xml, parse_nav_document, parse_ncx,
    parse_opf,
};
use crate::error::{Error, Result};
use crate::import::{ContentUnit, ImportedBook, Importer, Metadata, NativeToc, UnitBody, title_from_file_name};
use crate::io::ByteSource;
use crate::util::{decode_href, decode_text, extract_xml_encoding, resolve_relative_path, split_fragment};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// EPUB importer over a random-access ZIP index.
///
/// When `container.xml` or the OPF package cannot be used, the importer
/// switches to degraded mode: every HTML entry of the archive becomes a
/// content unit, in archive order, and no native navigation is reported.
pub struct EpubImporter {
    metadata: Metadata,
    units: Vec<ContentUnit>,
    native_toc: NativeToc,
    degraded: bool,
}

impl Importer for EpubImporter {
    fn open(source: Arc<dyn ByteSource>, file_name: Option<&str>, config: &EngineConfig) -> Result<Self> {
        let zip = ZipIndex::new(source)?;

        let mut importer = match Self::from_package(&zip, config) {
            Ok(importer) => importer,
            Err(e) => {
                log::warn!("EPUB package unusable ({e}); scanning archive for HTML entries");
                Self::degraded(&zip, config)
            }
        };

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

impl EpubImporter {
    /// True when the package could not be used and archive order was taken instead.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Spine-ordered import through container.xml and the OPF.
    fn from_package(zip: &ZipIndex, config: &EngineConfig) -> Result<Self> {
        let container = read_required(zip, CONTAINER_PATH)?;
        let opf_path = parse_container_xml(&container)?;

        let opf_bytes = read_required(zip, &opf_path)?;
        let opf = parse_opf(&decode(&opf_bytes, config))?;

        let units = load_spine(zip, &opf, &opf_path, config);
        if units.is_empty() {
            return Err(Error::ManifestNotFound(format!(
                "spine of {opf_path} names no readable content"
            )));
        }

        let native_toc = load_navigation(zip, &opf, &opf_path, config);

        Ok(Self {
            metadata: opf.metadata,
            units,
            native_toc,
            degraded: false,
        })
    }

    /// Archive-order import of every HTML entry.
    fn degraded(zip: &ZipIndex, config: &EngineConfig) -> Self {
        let mut units = Vec::new();
        for name in zip.names().filter(|name| is_html_path(name)) {
            match zip.read(name) {
                Ok(bytes) => units.push(ContentUnit {
                    href: name.to_string(),
                    title: None,
                    body: UnitBody::Markup(decode(&bytes, config)),
                }),
                Err(e) => log::warn!("skipping unreadable archive entry {name}: {e}"),
            }
        }

        Self {
            metadata: Metadata::default(),
            units,
            native_toc: NativeToc::None,
            degraded: true,
        }
    }
}

fn load_spine(zip: &ZipIndex, opf: &OpfData, opf_path: &str, config: &EngineConfig) -> Vec<ContentUnit> {
    let mut units = Vec::with_capacity(opf.spine_ids.len());

    for idref in &opf.spine_ids {
        let Some(item) = opf.manifest.get(idref) else {
            log::warn!("spine item {idref} is not in the manifest; skipped");
            continue;
        };
        if !item.is_html() {
            log::debug!("spine item {idref} ({}) is not HTML; skipped", item.media_type);
            continue;
        }

        let path = resolve_relative_path(opf_path, &decode_href(&item.href));
        match zip.read(&path) {
            Ok(bytes) => units.push(ContentUnit {
                href: path,
                title: None,
                body: UnitBody::Markup(decode(&bytes, config)),
            }),
            Err(e) => log::warn!("spine target {path} missing from archive ({e}); skipped"),
        }
    }

    units
}

/// NCX first, then the EPUB 3 navigation document.
fn load_navigation(zip: &ZipIndex, opf: &OpfData, opf_path: &str, config: &EngineConfig) -> NativeToc {
    if let Some(href) = &opf.ncx_href {
        let ncx_path = resolve_relative_path(opf_path, &decode_href(href));
        match zip.read(&ncx_path) {
            Ok(bytes) => match parse_ncx(&decode(&bytes, config)) {
                Ok(points) if !points.is_empty() => {
                    return NativeToc::Nav(resolve_targets(points, &ncx_path));
                }
                Ok(_) => log::debug!("NCX {ncx_path} has no entries"),
                Err(e) => log::debug!("NCX {ncx_path} unparseable: {e}"),
            },
            Err(e) => log::debug!("NCX {ncx_path} not readable: {e}"),
        }
    } else {
        log::debug!("package declares no NCX");
    }

    if let Some(href) = &opf.nav_href {
        let nav_path = resolve_relative_path(opf_path, &decode_href(href));
        if let Ok(bytes) = zip.read(&nav_path) {
            let points = parse_nav_document(&decode(&bytes, config));
            if !points.is_empty() {
                return NativeToc::Nav(resolve_targets(points, &nav_path));
            }
        }
        log::debug!("navigation document {nav_path} yielded no entries");
    }

    NativeToc::None
}

/// Rewrite navigation targets as archive paths, keeping fragments.
fn resolve_targets(points: Vec<NavPoint>, base: &str) -> Vec<NavPoint> {
    points
        .into_iter()
        .filter_map(|point| {
            let (path, fragment) = split_fragment(&point.src);
            if path.is_empty() {
                return None;
            }
            let mut src = resolve_relative_path(base, &decode_href(path));
            if let Some(fragment) = fragment {
                src.push('#');
                src.push_str(fragment);
            }
            Some(NavPoint { src, ..point })
        })
        .collect()
}

fn read_required(zip: &ZipIndex, path: &str) -> Result<Vec<u8>> {
    zip.read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::ManifestNotFound(format!("{path} not in archive")),
        _ => Error::SourceUnreadable(e),
    })
}

fn decode(bytes: &[u8], config: &EngineConfig) -> String {
    decode_text(bytes, extract_xml_encoding(bytes), &config.fallback_encoding).into_owned()
}
