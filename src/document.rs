//! The paginated document facade.

use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::import::{ContentUnit, EpubImporter, Fb2Importer, ImportedBook, Importer, Metadata, TextImporter};
use crate::io::Source;
use crate::paginate::{Page, Paginator};
use crate::search;
use crate::toc::{TocItem, extract_toc};
use crate::util::split_fragment;

/// A fully ingested book: pages, table of contents and metadata.
///
/// A `Document` is immutable once built. Opening never fails because of
/// what is inside a supported source: broken packages, missing navigation
/// and empty bodies degrade to fallback content and navigation instead.
///
/// ```
/// use folio::{Document, EngineConfig, Source};
///
/// let source = Source::from_bytes(b"Call me Ishmael.\n\nSome years ago.".to_vec());
/// let doc = Document::from_source(&source, Some("text/plain"), Some("moby.txt"), &EngineConfig::default())?;
///
/// assert_eq!(doc.metadata().title, "moby");
/// assert_eq!(doc.page_count(), 1);
/// assert_eq!(doc.search("ishmael"), vec![0]);
/// # Ok::<(), folio::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    format: Format,
    metadata: Metadata,
    units: Vec<ContentUnit>,
    unit_starts: Vec<usize>,
    pages: Vec<Page>,
    placeholder: bool,
    toc: Vec<TocItem>,
}

impl Document {
    /// Open a local file with the default configuration. The format is
    /// inferred from the file extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &EngineConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self::from_source(&Source::from_path(path), None, file_name.as_deref(), config)
    }

    /// Ingest a caller-described source.
    ///
    /// `media_type` takes precedence over the extension of `file_name` for
    /// format detection. When `file_name` is absent the file name of a
    /// path source is used. Only unreadable sources and unsupported formats
    /// are reported as errors.
    pub fn from_source(
        source: &Source,
        media_type: Option<&str>,
        file_name: Option<&str>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let file_name = file_name.map(str::to_owned).or_else(|| {
            source
                .path()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        });
        let file_name = file_name.as_deref();

        let format = Format::detect(media_type, file_name);
        log::debug!("detected {format} for {:?} ({:?})", file_name, media_type);

        let book = match format {
            Format::Epub => EpubImporter::open(source.open()?, file_name, config)?.into_book(),
            Format::Fb2 => Fb2Importer::open(source.open()?, file_name, config)?.into_book(),
            Format::Text => TextImporter::open(source.open()?, file_name, config)?.into_book(),
            Format::Unsupported => {
                let what = media_type.or(file_name).unwrap_or("unnamed source");
                return Err(Error::UnsupportedFormat(what.to_string()));
            }
        };

        Ok(Self::from_imported(format, book, config))
    }

    /// Paginate an already imported book and recover its table of contents.
    pub fn from_imported(format: Format, book: ImportedBook, config: &EngineConfig) -> Self {
        let pagination = Paginator::new(config.page_size).paginate_units(&book.units);
        if pagination.placeholder {
            log::warn!(
                "{} in {format} document {:?}; showing a placeholder page",
                Error::NoContentExtracted,
                book.metadata.title
            );
        }

        let toc = extract_toc(format, &book.native_toc, &book.units, &pagination, config);
        log::debug!(
            "{} units paginated into {} pages with {} TOC entries",
            book.units.len(),
            pagination.pages.len(),
            toc.len()
        );

        Self {
            format,
            metadata: book.metadata,
            units: book.units,
            unit_starts: pagination.unit_starts,
            pages: pagination.pages,
            placeholder: pagination.placeholder,
            toc,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Content units in reading order.
    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page by 0-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Number of pages. Never zero.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when the source had no visible content and the only page is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn toc(&self) -> &[TocItem] {
        &self.toc
    }

    /// 0-based index of the first page of the unit at `href`. A `#fragment` is ignored.
    pub fn unit_start_page(&self, href: &str) -> Option<usize> {
        let (path, _) = split_fragment(href);
        self.units
            .iter()
            .position(|unit| unit.href == path)
            .map(|i| self.unit_starts[i])
    }

    /// 0-based indices of pages containing `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<usize> {
        search::search(&self.pages, query)
    }

    /// Markup of page `index` with every occurrence of `query` highlighted.
    pub fn highlight(&self, index: usize, query: &str) -> Option<String> {
        self.page(index).map(|page| search::highlight(page.markup(), query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::UnitBody;

    fn text_document(text: &str, page_size: usize) -> Document {
        let config = EngineConfig::default().with_page_size(page_size);
        let source = Source::from_bytes(text.as_bytes().to_vec());
        Document::from_source(&source, None, Some("story.txt"), &config).unwrap()
    }

    #[test]
    fn test_text_document() {
        let doc = text_document("First paragraph here.\n\nSecond paragraph here.", 25);
        assert_eq!(doc.format(), Format::Text);
        assert_eq!(doc.metadata().title, "story");
        assert_eq!(doc.page_count(), 2);
        assert!(!doc.is_placeholder());
        assert_eq!(doc.unit_start_page("story.txt"), Some(0));
        assert_eq!(doc.unit_start_page("other.txt"), None);
        assert_eq!(doc.search("SECOND"), vec![1]);
        assert!(doc.highlight(1, "second").unwrap().contains("search-highlight"));
        assert_eq!(doc.highlight(7, "second"), None);
    }

    #[test]
    fn test_empty_text_is_placeholder() {
        let doc = text_document("", 100);
        assert!(doc.is_placeholder());
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.toc(), &[TocItem::new("Start of book", 1, 1)]);
    }

    #[test]
    fn test_unsupported_format() {
        let source = Source::from_bytes(b"%PDF-1.7".to_vec());
        let err = Document::from_source(&source, None, Some("scan.pdf"), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref what) if what == "scan.pdf"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = Document::open("/definitely/not/here.epub").unwrap_err();
        assert!(err.is_source_unreadable());
    }

    #[test]
    fn test_from_imported_units() {
        let book = ImportedBook {
            units: vec![
                ContentUnit {
                    href: "a.xhtml".into(),
                    title: None,
                    body: UnitBody::Markup("<p>alpha</p>".into()),
                },
                ContentUnit {
                    href: "b.xhtml".into(),
                    title: None,
                    body: UnitBody::Markup("<p>beta</p>".into()),
                },
            ],
            ..ImportedBook::default()
        };
        let doc = Document::from_imported(Format::Epub, book, &EngineConfig::default());
        assert_eq!(doc.unit_start_page("b.xhtml#frag"), Some(1));
        assert_eq!(doc.toc().len(), 2);
    }
}
