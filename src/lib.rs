//! # folio
//!
//! An ebook ingestion and pagination engine. EPUB, FB2 and plain-text
//! sources are turned into a sequence of self-contained HTML pages, a
//! leveled table of contents and a simple full-text search.
//!
//! ## Features
//!
//! - EPUB 2/3 packages, with a degraded mode for broken or missing manifests
//! - FictionBook 2 (plain or zipped, any declared encoding)
//! - Plain text with legacy-encoding fallback
//! - Markup repair: every page is balanced, whatever the input looked like
//! - Tables of contents from NCX / nav documents, FB2 sections, or detected headings
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::Document;
//!
//! let doc = Document::open("book.epub")?;
//! println!("{} ({} pages)", doc.metadata().title, doc.page_count());
//! for item in doc.toc() {
//!     println!("{:indent$}{} .... {}", "", item.title, item.page, indent = (item.level - 1) * 2);
//! }
//! for index in doc.search("white whale") {
//!     let page = doc.highlight(index, "white whale");
//!     # let _ = page;
//! }
//! # Ok::<(), folio::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! [`Format`] detection picks an importer from [`import`], which produces
//! ordered content units. The [`paginate::Paginator`] repairs and splits
//! them into [`Page`]s, and [`toc::extract_toc`] maps native navigation (or
//! detected headings) onto page numbers. [`Document`] runs the whole
//! pipeline.

pub mod config;
pub mod document;
pub mod epub;
pub mod error;
pub mod format;
pub mod import;
pub mod io;
pub mod markup;
pub mod paginate;
pub mod search;
pub mod toc;
pub(crate) mod util;

pub use config::{Deadline, EngineConfig};
pub use document::Document;
pub use error::{Error, Result};
pub use format::Format;
pub use import::{ContentUnit, Metadata};
pub use io::{ByteSource, Source};
pub use paginate::{Page, Paginator};
pub use toc::TocItem;
