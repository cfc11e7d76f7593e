//! Engine configuration.

use std::time::{Duration, Instant};

/// Tunables for pagination and table-of-contents recovery.
///
/// ```
/// use folio::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_page_size(900)
///     .with_toc_deadline(Some(Duration::from_secs(2)));
/// assert_eq!(config.page_size, 900);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Target visible characters per page. Pages may overshoot by one word.
    pub page_size: usize,
    /// Number of leading pages scanned for heading-like content.
    pub heuristic_scan_pages: usize,
    /// Cap on heuristically detected TOC entries.
    pub max_toc_entries: usize,
    /// Maximum characters kept in a TOC title.
    pub max_title_chars: usize,
    /// Budget for table-of-contents extraction. `None` disables the deadline.
    pub toc_deadline: Option<Duration>,
    /// Encoding label for text that is neither UTF-8 nor self-describing.
    pub fallback_encoding: String,
}

pub const DEFAULT_PAGE_SIZE: usize = 1500;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            heuristic_scan_pages: 150,
            max_toc_entries: 50,
            max_title_chars: 100,
            toc_deadline: Some(Duration::from_secs(5)),
            fallback_encoding: "windows-1252".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_heuristic_scan_pages(mut self, pages: usize) -> Self {
        self.heuristic_scan_pages = pages;
        self
    }

    pub fn with_max_toc_entries(mut self, entries: usize) -> Self {
        self.max_toc_entries = entries;
        self
    }

    pub fn with_max_title_chars(mut self, chars: usize) -> Self {
        self.max_title_chars = chars.max(1);
        self
    }

    pub fn with_toc_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.toc_deadline = deadline;
        self
    }

    pub fn with_fallback_encoding(mut self, label: impl Into<String>) -> Self {
        self.fallback_encoding = label.into();
        self
    }
}

/// A point in time after which best-effort work should stop.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn never() -> Self {
        Deadline(None)
    }

    pub fn after(budget: Option<Duration>) -> Self {
        Deadline(budget.and_then(|b| Instant::now().checked_add(b)))
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}
