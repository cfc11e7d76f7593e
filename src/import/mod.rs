//! Format importers.
//!
//! Each importer turns a source into an ordered list of [`ContentUnit`]s
//! plus whatever native navigation the format carries. Importers never
//! paginate; that happens once, uniformly, in [`crate::paginate`].

mod epub;
mod fb2;
mod text;

pub use epub::EpubImporter;
pub use fb2::Fb2Importer;
pub use text::TextImporter;

use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::epub::NavPoint;
use crate::error::Result;
use crate::io::ByteSource;

/// Bibliographic metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
}

/// Raw content of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitBody {
    /// (X)HTML markup, possibly malformed.
    Markup(String),
    /// Plain text with blank-line paragraph breaks.
    Text(String),
}

/// One spine item, FB2 section or text body, before pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    /// Archive path for EPUB, section id for FB2, file name for text.
    pub href: String,
    pub title: Option<String>,
    pub body: UnitBody,
}

/// A title found while walking FB2 sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTitle {
    pub title: String,
    /// Section nesting depth, starting at 1.
    pub level: usize,
}

/// Navigation structure declared by the source itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NativeToc {
    #[default]
    None,
    /// NCX or EPUB 3 nav entries, with `src` resolved to archive paths.
    Nav(Vec<NavPoint>),
    /// FB2 section titles in document order.
    Sections(Vec<SectionTitle>),
}

/// Everything an importer extracted from a source.
#[derive(Debug, Clone, Default)]
pub struct ImportedBook {
    pub metadata: Metadata,
    pub units: Vec<ContentUnit>,
    pub native_toc: NativeToc,
}

/// Interface for format-specific readers.
pub trait Importer: Send + Sync {
    /// Read `source` and extract its structure and content.
    ///
    /// `file_name` is used for fallback titles only.
    fn open(source: Arc<dyn ByteSource>, file_name: Option<&str>, config: &EngineConfig) -> Result<Self>
    where
        Self: Sized;

    fn metadata(&self) -> &Metadata;

    /// Content units in reading order.
    fn units(&self) -> &[ContentUnit];

    fn native_toc(&self) -> &NativeToc;

    fn into_book(self) -> ImportedBook
    where
        Self: Sized;
}

/// Title derived from a file name: the stem, without `.fb2` for `.fb2.zip`.
pub(crate) fn title_from_file_name(file_name: Option<&str>) -> String {
    let Some(name) = file_name else {
        return String::new();
    };
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let lower = base.to_ascii_lowercase();
    let cut = [".fb2.zip", ".epub", ".fb2", ".txt"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| base.len() - ext.len())
        .or_else(|| base.rfind('.').filter(|&i| i > 0))
        .unwrap_or(base.len());

    base[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(title_from_file_name(Some("/books/War and Peace.txt")), "War and Peace");
        assert_eq!(title_from_file_name(Some("novel.FB2.zip")), "novel");
        assert_eq!(title_from_file_name(Some("noext")), "noext");
        assert_eq!(title_from_file_name(Some(".hidden")), ".hidden");
        assert_eq!(title_from_file_name(None), "");
    }
}
