//! Error types for folio operations.

use thiserror::Error;

/// Errors that can occur while ingesting a document.
///
/// Only [`Error::SourceUnreadable`], [`Error::Archive`] and
/// [`Error::UnsupportedFormat`] ever reach callers of
/// [`Document::from_source`](crate::Document::from_source). The remaining
/// variants describe anomalies that the engine recovers from internally
/// (degraded EPUB mode, heuristic navigation, placeholder pages).
#[derive(Error, Debug)]
pub enum Error {
    #[error("source unreadable: {0}")]
    SourceUnreadable(#[from] std::io::Error),

    #[error("archive unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("XML parsing error: {0}")]
    Xml(String),

    /// Completes the error taxonomy. Markup repair never fails, so no
    /// operation in this crate returns it.
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),

    #[error("no content extracted")]
    NoContentExtracted,
}

impl Error {
    /// True for failures to open or read the underlying source.
    pub fn is_source_unreadable(&self) -> bool {
        matches!(self, Error::SourceUnreadable(_) | Error::Archive(_))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unreadable_classification() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_source_unreadable());
        assert!(!Error::UnsupportedFormat("pdf".into()).is_source_unreadable());
        assert!(!Error::NoContentExtracted.is_source_unreadable());
        assert!(!Error::MalformedMarkup("<p>".into()).is_source_unreadable());
    }

    #[test]
    fn test_display() {
        let e = Error::ManifestNotFound("META-INF/container.xml".into());
        assert_eq!(e.to_string(), "manifest not found: META-INF/container.xml");
    }
}
