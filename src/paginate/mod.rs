//! Pagination of content units into self-contained HTML pages.
//!
//! Every page is a complete `<html><head></head><body>...</body></html>`
//! document whose tags are balanced. Pages are cut between text runs or, when
//! a run does not fit, at the last sentence end or whitespace inside it.

mod builder;
mod split;

use std::sync::LazyLock;

use regex::Regex;

use crate::import::{ContentUnit, UnitBody};
use crate::markup::{normalize_parts, strip_tags};
use crate::util::{collapse_whitespace, escape_html};

use builder::{PAGE_CLOSE, PAGE_OPEN, PageBuilder};

/// Body of the page produced for documents with no visible content.
pub const PLACEHOLDER_BODY: &str = r#"<p class="placeholder">No content available.</p>"#;

static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t\r\f\v]*\n").unwrap());

/// One page of output: a self-contained HTML document and its 0-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Page {
    index: usize,
    markup: String,
    /// Length of the body prefix that reopens elements cut by the previous page.
    #[cfg_attr(feature = "cli", serde(skip))]
    reopened: usize,
}

impl Page {
    pub fn new(index: usize, markup: String) -> Self {
        Self {
            index,
            markup,
            reopened: 0,
        }
    }

    /// A page whose body starts with `reopened` bytes of start tags carried
    /// over from the previous page.
    pub fn continued(index: usize, markup: String, reopened: usize) -> Self {
        Self {
            index,
            markup,
            reopened,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Visible text of the page.
    pub fn text(&self) -> String {
        strip_tags(&self.markup)
    }

    pub fn into_markup(self) -> String {
        self.markup
    }

    /// True when the page opens inside elements started on an earlier page.
    pub fn is_continued(&self) -> bool {
        self.reopened > 0
    }

    /// Markup that begins on this page: everything after the page shell and
    /// the reopened start tags.
    pub fn fresh_markup(&self) -> &str {
        let shell = if self.markup.starts_with(PAGE_OPEN) {
            PAGE_OPEN.len()
        } else {
            0
        };
        self.markup.get(shell + self.reopened..).unwrap_or(&self.markup)
    }
}

/// Pages of a whole document plus where each content unit starts.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub pages: Vec<Page>,
    /// 0-based index of the first page of each content unit. A unit that
    /// produced no pages points at the page that follows it.
    pub unit_starts: Vec<usize>,
    /// True when no unit had visible content and a placeholder page was emitted.
    pub placeholder: bool,
}

/// Splits markup or plain text into pages of roughly `page_size` visible characters.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Paginate (possibly malformed) markup. Returns no pages for markup
    /// without visible content.
    pub fn paginate_markup(&self, markup: &str) -> Vec<String> {
        self.build(markup).into_iter().map(|(page, _)| page).collect()
    }

    fn build(&self, markup: &str) -> Vec<(String, usize)> {
        let normalized = normalize_parts(markup);
        let mut builder = PageBuilder::new(self.page_size);
        builder.push_markup(normalized.body());
        builder.finish()
    }

    /// Paginate plain text. Paragraphs are separated by blank lines.
    pub fn paginate_text(&self, text: &str) -> Vec<String> {
        self.paginate_markup(&text_to_markup(text))
    }

    /// Paginate content units in order, falling back to a single placeholder
    /// page when nothing visible was produced.
    pub fn paginate_units(&self, units: &[ContentUnit]) -> Pagination {
        let mut pages: Vec<Page> = Vec::new();
        let mut unit_starts = Vec::with_capacity(units.len());

        for unit in units {
            unit_starts.push(pages.len());
            let built = match &unit.body {
                UnitBody::Markup(markup) => self.build(markup),
                UnitBody::Text(text) => self.build(&text_to_markup(text)),
            };
            for (markup, reopened) in built {
                pages.push(Page::continued(pages.len(), markup, reopened));
            }
        }

        let placeholder = pages.is_empty();
        if placeholder {
            pages.push(placeholder_page());
        }

        let last = pages.len() - 1;
        for start in &mut unit_starts {
            *start = (*start).min(last);
        }

        Pagination {
            pages,
            unit_starts,
            placeholder,
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PAGE_SIZE)
    }
}

pub fn placeholder_page() -> Page {
    Page::new(0, format!("{PAGE_OPEN}{PLACEHOLDER_BODY}{PAGE_CLOSE}"))
}

/// Wrap plain text in paragraph markup.
///
/// Blank lines separate paragraphs; hard line breaks inside a paragraph are
/// reflowed into single spaces.
pub fn text_to_markup(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for paragraph in BLANK_LINE.split(&text) {
        let paragraph = collapse_whitespace(paragraph);
        if paragraph.is_empty() {
            continue;
        }
        out.push_str("<p>");
        out.push_str(&escape_html(&paragraph));
        out.push_str("</p>\n");
    }
    out
}
