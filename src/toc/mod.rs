//! Table-of-contents recovery.
//!
//! Native navigation is used when the source has it: the EPUB NCX (or EPUB 3
//! nav document) and FB2 section titles. Otherwise, or when the native data
//! is degenerate, headings are detected in the paginated content. As a last
//! resort evenly spaced position markers are produced, so the result is never
//! empty.
//!
//! Page numbers on [`TocItem`] are 1-based. Numbers derived from FB2 titles
//! or from heuristics are estimates.

mod heuristic;
mod native;

pub use heuristic::{HeadingRule, detect_headings, position_markers};
pub use native::{PageEstimator, deslug_file_name};

use crate::config::{Deadline, EngineConfig};
use crate::format::Format;
use crate::import::{ContentUnit, NativeToc};
use crate::paginate::Pagination;

/// One table-of-contents entry.
///
/// Entries compare equal when title, page and level match.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocItem {
    /// Display title, tag-free and length-bounded.
    pub title: String,
    /// 1-based page number.
    pub page: usize,
    /// Nesting depth, starting at 1.
    pub level: usize,
    /// Source reference the page was derived from, such as `OEBPS/ch1.xhtml#s2`.
    #[cfg_attr(feature = "cli", serde(skip))]
    pub(crate) content_ref: Option<String>,
}

impl TocItem {
    pub fn new(title: impl Into<String>, page: usize, level: usize) -> Self {
        Self {
            title: title.into(),
            page,
            level,
            content_ref: None,
        }
    }

    /// 0-based index of the target page.
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1)
    }
}

impl PartialEq for TocItem {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title && self.page == other.page && self.level == other.level
    }
}

impl Eq for TocItem {}

/// Build the table of contents for a paginated document.
pub fn extract_toc(
    format: Format,
    native: &NativeToc,
    units: &[ContentUnit],
    pagination: &Pagination,
    config: &EngineConfig,
) -> Vec<TocItem> {
    let deadline = Deadline::after(config.toc_deadline);
    let page_count = pagination.pages.len();

    if pagination.placeholder {
        return position_markers(page_count);
    }

    let items = match native {
        NativeToc::Nav(points) => native::from_nav_points(points, units, pagination, config, &deadline),
        NativeToc::Sections(titles) => native::from_section_titles(titles, page_count, config),
        NativeToc::None => Vec::new(),
    };

    match format {
        Format::Epub if !items.is_empty() => return items,
        Format::Fb2 if items.len() > 1 => return items,
        _ => {}
    }

    if format == Format::Epub {
        let by_name = native::from_file_names(units, pagination, config);
        if by_name.len() > 1 {
            log::debug!("no usable EPUB navigation; titled {} units from file names", by_name.len());
            return by_name;
        }
    }

    log::info!("falling back to heading detection over {page_count} pages");
    detect_headings(&pagination.pages, config, &deadline)
}
