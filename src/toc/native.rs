//! Mapping of native navigation onto pages.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{Deadline, EngineConfig};
use crate::epub::NavPoint;
use crate::import::{ContentUnit, SectionTitle};
use crate::markup::{Token, tokenize};
use crate::paginate::{Page, Pagination};
use crate::util::{collapse_whitespace, split_fragment, truncate_title};

use super::TocItem;

/// Navigation points resolved through the unit start-page table.
///
/// Points whose target is not a content unit are skipped. A `#fragment`
/// moves the entry to the first page of the unit that carries the anchor.
pub(super) fn from_nav_points(
    points: &[NavPoint],
    units: &[ContentUnit],
    pagination: &Pagination,
    config: &EngineConfig,
    deadline: &Deadline,
) -> Vec<TocItem> {
    let by_href: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(i, unit)| (unit.href.as_str(), i))
        .collect();
    let page_count = pagination.pages.len();

    let mut items = Vec::with_capacity(points.len());
    for point in points {
        let (path, fragment) = split_fragment(&point.src);
        let Some(&unit) = by_href.get(path) else {
            log::debug!("navigation target {} is not in the spine; skipped", point.src);
            continue;
        };

        let start = pagination.unit_starts[unit];
        let end = pagination
            .unit_starts
            .get(unit + 1)
            .copied()
            .unwrap_or(page_count)
            .clamp(start + 1, page_count);

        let mut page = start;
        if let Some(fragment) = fragment
            && !deadline.expired()
            && let Some(offset) = find_anchor(&pagination.pages[start..end], fragment)
        {
            page = start + offset;
        }

        let title = if point.title.is_empty() {
            deslug_file_name(path, items.len() + 1)
        } else {
            truncate_title(&point.title, config.max_title_chars)
        };

        items.push(TocItem {
            title,
            page: page + 1,
            level: point.level.max(1),
            content_ref: Some(point.src.clone()),
        });
    }

    items
}

/// Index of the first page holding an element with `id` (or `name`) `anchor`.
fn find_anchor(pages: &[Page], anchor: &str) -> Option<usize> {
    pages.iter().position(|page| {
        tokenize(page.markup()).any(|token| match token {
            Token::Start(tag) => tag.attr("id") == Some(anchor) || tag.attr("name") == Some(anchor),
            _ => false,
        })
    })
}

/// Proportional page estimate for titles that carry no page information.
///
/// The `i`-th of `total` titles lands on page `1 + floor(i / total * pages)`,
/// never before the page of the previous title and never past the last page.
#[derive(Debug, Clone)]
pub struct PageEstimator {
    total_titles: usize,
    total_pages: usize,
    previous: usize,
}

impl PageEstimator {
    pub fn new(total_titles: usize, total_pages: usize) -> Self {
        Self {
            total_titles: total_titles.max(1),
            total_pages: total_pages.max(1),
            previous: 1,
        }
    }

    /// 1-based page estimate for title number `occurrence` (0-based).
    pub fn estimate(&mut self, occurrence: usize) -> usize {
        let raw = 1 + occurrence * self.total_pages / self.total_titles;
        let page = raw.max(self.previous).min(self.total_pages);
        self.previous = page;
        page
    }
}

pub(super) fn from_section_titles(
    titles: &[SectionTitle],
    page_count: usize,
    config: &EngineConfig,
) -> Vec<TocItem> {
    let mut estimator = PageEstimator::new(titles.len(), page_count);
    titles
        .iter()
        .enumerate()
        .map(|(i, section)| TocItem {
            title: truncate_title(&section.title, config.max_title_chars),
            page: estimator.estimate(i),
            level: section.level.max(1),
            content_ref: None,
        })
        .collect()
}

/// One entry per content unit, titled after its file name.
pub(super) fn from_file_names(
    units: &[ContentUnit],
    pagination: &Pagination,
    config: &EngineConfig,
) -> Vec<TocItem> {
    units
        .iter()
        .zip(&pagination.unit_starts)
        .enumerate()
        .map(|(i, (unit, &start))| {
            let title = match &unit.title {
                Some(title) => title.clone(),
                None => deslug_file_name(&unit.href, i + 1),
            };
            TocItem {
                title: truncate_title(&title, config.max_title_chars),
                page: start + 1,
                level: 1,
                content_ref: Some(unit.href.clone()),
            }
        })
        .collect()
}

/// Turn an archive path into a display title.
///
/// `text/03_the-storm.xhtml` becomes `Chapter 03 the storm`; a name with no
/// usable characters becomes `Section {ordinal}`.
pub fn deslug_file_name(href: &str, ordinal: usize) -> String {
    let stem = Path::new(href)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let words = collapse_whitespace(&stem.replace(['_', '-'], " "));
    if words.is_empty() {
        return format!("Section {ordinal}");
    }

    let titled = if words.starts_with(|c: char| c.is_ascii_digit()) {
        let digits = words.len() - words.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let rest = words[digits..].trim();
        if rest.is_empty() {
            format!("Chapter {}", &words[..digits])
        } else {
            format!("Chapter {} {rest}", &words[..digits])
        }
    } else {
        words
    };

    let mut chars = titled.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => format!("Section {ordinal}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::UnitBody;
    use crate::paginate::Paginator;

    #[test]
    fn test_deslug_file_name() {
        assert_eq!(deslug_file_name("OEBPS/text/03_the-storm.xhtml", 1), "Chapter 03 the storm");
        assert_eq!(deslug_file_name("ch12.html", 1), "Ch12");
        assert_eq!(deslug_file_name("007.xhtml", 1), "Chapter 007");
        assert_eq!(deslug_file_name("about_the_author.xhtml", 1), "About the author");
        assert_eq!(deslug_file_name("___.xhtml", 4), "Section 4");
    }

    #[test]
    fn test_page_estimator_is_monotonic_and_bounded() {
        let mut estimator = PageEstimator::new(3, 9);
        let pages: Vec<_> = (0..3).map(|i| estimator.estimate(i)).collect();
        assert_eq!(pages, vec![1, 4, 7]);

        let mut crowded = PageEstimator::new(10, 2);
        let pages: Vec<_> = (0..10).map(|i| crowded.estimate(i)).collect();
        assert!(pages.windows(2).all(|w| w[0] <= w[1]));
        assert!(pages.iter().all(|&p| (1..=2).contains(&p)));
    }

    #[test]
    fn test_fragment_resolves_to_anchor_page() {
        let body = r#"<p>one two three four</p><p id="late">five six seven eight</p>"#;
        let units = vec![ContentUnit {
            href: "c.xhtml".into(),
            title: None,
            body: UnitBody::Markup(body.into()),
        }];
        let pagination = Paginator::new(20).paginate_units(&units);
        assert_eq!(pagination.pages.len(), 2);

        let points = vec![
            NavPoint { title: "Start".into(), src: "c.xhtml".into(), level: 1 },
            NavPoint { title: "Late".into(), src: "c.xhtml#late".into(), level: 2 },
            NavPoint { title: "Ghost".into(), src: "c.xhtml#ghost".into(), level: 2 },
        ];
        let items = from_nav_points(&points, &units, &pagination, &EngineConfig::default(), &Deadline::never());
        let pages: Vec<_> = items.iter().map(|i| (i.title.as_str(), i.page, i.level)).collect();
        assert_eq!(pages, vec![("Start", 1, 1), ("Late", 2, 2), ("Ghost", 1, 2)]);
    }

    #[test]
    fn test_anchor_ignores_lookalike_attributes() {
        let pages = vec![
            Page::new(0, r#"<p data-id="late" xml:id="late">one</p>"#.into()),
            Page::new(1, r#"<p><a name="late"></a>two</p>"#.into()),
            Page::new(2, r#"<p id="late">three</p>"#.into()),
        ];
        assert_eq!(find_anchor(&pages, "late"), Some(1));
        assert_eq!(find_anchor(&pages[2..], "late"), Some(0));
        assert_eq!(find_anchor(&pages[..1], "late"), None);
    }
}
