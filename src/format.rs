//! Input format detection.

use std::fmt;

/// Document container formats understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum Format {
    /// EPUB 2/3 (ZIP container with OPF package).
    Epub,
    /// FictionBook 2 XML, plain or zipped.
    Fb2,
    /// Plain text.
    Text,
    /// Anything else (including PDF). Rejected before ingestion.
    Unsupported,
}

impl Format {
    /// Classify a source.
    ///
    /// A recognized `media_type` wins; otherwise the lowercase file extension
    /// decides. Unknown media types fall through to the extension check.
    ///
    /// ```
    /// use folio::Format;
    ///
    /// assert_eq!(Format::detect(Some("application/epub+zip"), Some("book.txt")), Format::Epub);
    /// assert_eq!(Format::detect(None, Some("Book.FB2.zip")), Format::Fb2);
    /// assert_eq!(Format::detect(None, Some("scan.pdf")), Format::Unsupported);
    /// ```
    pub fn detect(media_type: Option<&str>, file_name: Option<&str>) -> Format {
        if let Some(format) = media_type.and_then(Format::from_media_type) {
            return format;
        }
        file_name
            .and_then(Format::from_file_name)
            .unwrap_or(Format::Unsupported)
    }

    /// Map a declared media type. Parameters such as `; charset=utf-8` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Format> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/epub+zip" => Some(Format::Epub),
            "application/x-fictionbook+xml"
            | "application/x-fictionbook"
            | "application/fb2"
            | "application/fb2+xml"
            | "text/fb2+xml"
            | "application/x-zip-compressed-fb2"
            | "application/fb2+zip" => Some(Format::Fb2),
            "text/plain" => Some(Format::Text),
            "application/pdf" => Some(Format::Unsupported),
            _ => None,
        }
    }

    /// Map a file name by its lowercase extension.
    pub fn from_file_name(file_name: &str) -> Option<Format> {
        let lower = file_name.trim().to_lowercase();

        if lower.ends_with(".epub") {
            Some(Format::Epub)
        } else if lower.ends_with(".fb2") || lower.ends_with(".fb2.zip") {
            Some(Format::Fb2)
        } else if lower.ends_with(".txt") {
            Some(Format::Text)
        } else {
            None
        }
    }

    pub fn is_supported(self) -> bool {
        self != Format::Unsupported
    }

    /// Canonical media type for the format.
    pub fn media_type(self) -> &'static str {
        match self {
            Format::Epub => "application/epub+zip",
            Format::Fb2 => "application/x-fictionbook+xml",
            Format::Text => "text/plain",
            Format::Unsupported => "application/octet-stream",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Epub => "EPUB",
            Format::Fb2 => "FB2",
            Format::Text => "TEXT",
            Format::Unsupported => "UNSUPPORTED",
        })
    }
}
