//! Heading detection over paginated content.
//!
//! Each rule looks at one page. Markup rules inspect the page's HTML; line
//! rules inspect its block-level lines of visible text. A page contributes at
//! most one entry, taken from the first rule in [`HeadingRule::ALL`] that
//! matches.
//!
//! Only markup that begins on the page is considered. Elements reopened from
//! the previous page, and text continuing a paragraph from it, are not
//! headings of this page.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{Deadline, EngineConfig};
use crate::markup::{Token, block_lines, is_block_element, strip_tags, tokenize};
use crate::paginate::Page;
use crate::util::{collapse_whitespace, truncate_title};

use super::TocItem;

/// Fewer detected headings than this and the result is replaced by position markers.
const MIN_HEADINGS: usize = 3;

/// Detected headings closer than this many pages to the previous one are dropped.
const DEDUPE_DISTANCE: usize = 2;

/// Longest line a line rule will consider a heading.
const MAX_HEADING_LINE: usize = 100;

/// `<h1>` .. `<h6>`
static HTML_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());

/// Class-name words that mark an element as a heading.
const HEADING_CLASS_WORDS: &[&str] = &["chapter", "heading", "title"];

/// `<b>` / `<strong>` spans
static STRONG_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:b|strong)\b[^>]*>(.*?)</(?:b|strong)\s*>").unwrap());

/// "Chapter 3", "Part II", "Глава первая", "Prologue", ...
static CHAPTER_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:chapter|part|section|book|глава|часть|раздел|книга)\s+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|первая|вторая|третья|первый|второй|третий)\b|(?:prologue|epilogue|introduction|пролог|эпилог|введение)\b)",
    )
    .unwrap()
});

/// "12", "IV.", "3) The Crossing"
static NUMBERED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}|[IVXLCDM]{1,7})(?:[.):]|\s*$)(?:\s+\S.{0,60})?$").unwrap()
});

/// One way of recognizing a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingRule {
    /// `<h1>`..`<h6>` elements.
    HtmlHeading,
    /// Elements with a class such as `chapter` or `title`.
    HeadingClass,
    /// Lines opening with a chapter/part/section keyword.
    ChapterKeyword,
    /// Lines that are a numeral, optionally followed by a short title.
    NumberedLine,
    /// Bold or strong spans of 5 to 100 characters.
    StrongSpan,
    /// Short all-uppercase lines.
    UppercaseLine,
    /// A short unpunctuated line that starts a block and is followed by a
    /// much longer line of body text.
    IsolatedLine,
}

impl HeadingRule {
    /// All rules, strongest first.
    pub const ALL: [HeadingRule; 7] = [
        HeadingRule::HtmlHeading,
        HeadingRule::HeadingClass,
        HeadingRule::ChapterKeyword,
        HeadingRule::NumberedLine,
        HeadingRule::StrongSpan,
        HeadingRule::UppercaseLine,
        HeadingRule::IsolatedLine,
    ];

    /// First heading this rule finds on a page, as display text.
    ///
    /// `lines` must be the page's [`block_lines`].
    pub fn find(self, markup: &str, lines: &[String]) -> Option<String> {
        match self {
            HeadingRule::HtmlHeading => first_capture(&HTML_HEADING_RE, markup, |_| true),
            HeadingRule::HeadingClass => heading_class_text(markup),
            HeadingRule::StrongSpan => {
                first_capture(&STRONG_SPAN_RE, markup, |t| (5..=100).contains(&t.chars().count()))
            }
            HeadingRule::ChapterKeyword => first_line(lines, |line| CHAPTER_KEYWORD_RE.is_match(line)),
            HeadingRule::NumberedLine => first_line(lines, |line| NUMBERED_LINE_RE.is_match(line)),
            HeadingRule::UppercaseLine => first_line(lines, is_uppercase_line),
            HeadingRule::IsolatedLine => lines
                .windows(2)
                .find(|pair| is_isolated_line(&pair[0], &pair[1]))
                .map(|pair| pair[0].clone()),
        }
    }
}

fn first_capture(re: &Regex, markup: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
    re.captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&strip_tags(m.as_str())))
        .find(|title| !title.is_empty() && accept(title))
}

/// Text of the first element whose class names a heading, if it is short
/// enough to be one.
fn heading_class_text(markup: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut open: Option<usize> = None;
    let mut text = String::new();

    for token in tokenize(markup) {
        match token {
            Token::Start(tag) if tag.is_empty_element() => {
                if open.is_some() {
                    text.push(' ');
                }
            }
            Token::Start(tag) => {
                depth += 1;
                if open.is_some() {
                    text.push(' ');
                } else if tag.attr("class").is_some_and(is_heading_class) {
                    open = Some(depth);
                    text.clear();
                }
            }
            Token::End(_) => {
                if open == Some(depth) {
                    open = None;
                    let title = collapse_whitespace(&strip_tags(&text));
                    if (1..=MAX_HEADING_LINE).contains(&title.chars().count()) {
                        return Some(title);
                    }
                } else if open.is_some() {
                    text.push(' ');
                }
                depth = depth.saturating_sub(1);
            }
            Token::Text(raw) if open.is_some() => text.push_str(raw),
            _ => {}
        }
    }
    None
}

fn is_heading_class(class: &str) -> bool {
    class
        .split_ascii_whitespace()
        .flat_map(|name| name.split(['-', '_']))
        .any(|word| {
            HEADING_CLASS_WORDS
                .iter()
                .any(|prefix| word.to_ascii_lowercase().starts_with(prefix))
        })
}

/// Block lines of the markup that begins on `page`. When the page opens in
/// the middle of a paragraph, that paragraph's tail is not a line of its own.
fn fresh_lines(page: &Page) -> Vec<String> {
    let fresh = page.fresh_markup();
    let mut lines = block_lines(fresh);

    let starts_mid_block = page.is_continued()
        && tokenize(fresh)
            .find(|token| !matches!(token, Token::Text(t) if t.trim().is_empty()))
            .is_some_and(|token| match token {
                Token::Text(_) => true,
                Token::Start(tag) => !is_block_element(&tag.name),
                _ => false,
            });
    if starts_mid_block && !lines.is_empty() {
        lines.remove(0);
    }
    lines
}

fn first_line(lines: &[String], accept: impl Fn(&str) -> bool) -> Option<String> {
    lines
        .iter()
        .filter(|line| line.chars().count() <= MAX_HEADING_LINE)
        .find(|line| accept(line))
        .cloned()
}

fn is_uppercase_line(line: &str) -> bool {
    let len = line.chars().count();
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    (3..=60).contains(&len)
        && letters >= 3
        && line.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
}

fn is_isolated_line(line: &str, next: &str) -> bool {
    let len = line.chars().count();
    (2..=60).contains(&len)
        && line.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        && !line.ends_with(['.', ',', ';', ':', '!', '?', '\u{2026}', '"', '\'', '\u{bb}', '\u{201d}'])
        && next.chars().count() > 2 * len.max(30)
}

/// Scan the leading pages for headings.
///
/// Returns evenly spaced [`position_markers`] instead when fewer than three
/// headings turn up, or when the deadline passes mid-scan.
pub fn detect_headings(pages: &[Page], config: &EngineConfig, deadline: &Deadline) -> Vec<TocItem> {
    let mut items: Vec<TocItem> = Vec::new();
    let mut last_page: Option<usize> = None;

    for page in pages.iter().take(config.heuristic_scan_pages) {
        if deadline.expired() {
            log::warn!(
                "heading detection ran out of time at page {}; using position markers",
                page.index() + 1
            );
            return position_markers(pages.len());
        }
        if items.len() >= config.max_toc_entries {
            break;
        }
        if last_page.is_some_and(|last| page.index().saturating_sub(last) <= DEDUPE_DISTANCE) {
            continue;
        }

        let markup = page.fresh_markup();
        let lines = fresh_lines(page);
        let found = HeadingRule::ALL
            .iter()
            .find_map(|rule| rule.find(markup, &lines).map(|title| (*rule, title)));

        if let Some((rule, title)) = found {
            log::trace!("page {}: {rule:?} heading {title:?}", page.index() + 1);
            items.push(TocItem::new(
                truncate_title(&title, config.max_title_chars),
                page.index() + 1,
                1,
            ));
            last_page = Some(page.index());
        }
    }

    if items.len() < MIN_HEADINGS {
        log::debug!("only {} headings detected; using position markers", items.len());
        return position_markers(pages.len());
    }
    items
}

/// Evenly spaced navigation entries for a document of `total_pages` pages.
///
/// Always starts with "Start of book" on page 1. Longer documents get an
/// entry every tenth of the book, labelled with its percentage, and "End of
/// book" on the last page.
pub fn position_markers(total_pages: usize) -> Vec<TocItem> {
    let total = total_pages.max(1);
    let mut items = vec![TocItem::new("Start of book", 1, 1)];
    if total == 1 {
        return items;
    }

    let step = total.div_ceil(10).max(1);
    for index in (step..total - 1).step_by(step) {
        items.push(TocItem::new(format!("{}%", index * 100 / total), index + 1, 1));
    }
    items.push(TocItem::new("End of book", total, 1));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ContentUnit, UnitBody};
    use crate::paginate::Paginator;

    fn find(rule: HeadingRule, markup: &str) -> Option<String> {
        rule.find(markup, &block_lines(markup))
    }

    fn pages(bodies: &[&str]) -> Vec<Page> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| Page::new(i, format!("<html><head></head><body>{body}</body></html>")))
            .collect()
    }

    const FILLER: &str = "<p>the rain kept falling on the roofs of the old town while nobody spoke at all</p>";

    #[test]
    fn test_html_heading() {
        let markup = r#"<p>intro</p><h2 class="c">Chapter <i>One</i></h2>"#;
        assert_eq!(find(HeadingRule::HtmlHeading, markup).as_deref(), Some("Chapter One"));
        assert_eq!(find(HeadingRule::HtmlHeading, "<h3> </h3><p>x</p>"), None);
    }

    #[test]
    fn test_heading_class() {
        let markup = r#"<p class="chapter-title">The <b>Storm</b></p>"#;
        assert_eq!(find(HeadingRule::HeadingClass, markup).as_deref(), Some("The Storm"));
        assert_eq!(
            find(HeadingRule::HeadingClass, r#"<div class="title">Home</div>"#).as_deref(),
            Some("Home")
        );
        assert_eq!(find(HeadingRule::HeadingClass, r#"<p class="subtitle">x</p>"#), None);
    }

    #[test]
    fn test_chapter_keyword() {
        assert_eq!(
            find(HeadingRule::ChapterKeyword, "<p>Chapter 12: Home</p><p>text</p>").as_deref(),
            Some("Chapter 12: Home")
        );
        assert!(find(HeadingRule::ChapterKeyword, "<p>ГЛАВА ПЕРВАЯ</p>").is_some());
        assert!(find(HeadingRule::ChapterKeyword, "<p>Part IV</p>").is_some());
        assert!(find(HeadingRule::ChapterKeyword, "<p>Prologue</p>").is_some());
        assert_eq!(find(HeadingRule::ChapterKeyword, "<p>Chapters are long.</p>"), None);
        assert_eq!(find(HeadingRule::ChapterKeyword, "<p>Part of the plan.</p>"), None);
    }

    #[test]
    fn test_numbered_line() {
        assert!(find(HeadingRule::NumberedLine, "<p>IV</p>").is_some());
        assert!(find(HeadingRule::NumberedLine, "<p>1. The Start</p>").is_some());
        assert!(find(HeadingRule::NumberedLine, "<p>12</p>").is_some());
        assert_eq!(find(HeadingRule::NumberedLine, "<p>3 apples were left.</p>"), None);
        assert_eq!(find(HeadingRule::NumberedLine, "<p>1984</p>"), None);
    }

    #[test]
    fn test_strong_span() {
        assert_eq!(
            find(HeadingRule::StrongSpan, "<p><b>Note</b> <strong>A New Day</strong></p>").as_deref(),
            Some("A New Day")
        );
    }

    #[test]
    fn test_uppercase_line() {
        assert_eq!(
            find(HeadingRule::UppercaseLine, "<p>THE END OF ALL THINGS</p>").as_deref(),
            Some("THE END OF ALL THINGS")
        );
        assert_eq!(find(HeadingRule::UppercaseLine, "<p>OK</p>"), None);
        assert_eq!(find(HeadingRule::UppercaseLine, "<p>Not Shouting</p>"), None);
    }

    #[test]
    fn test_isolated_line() {
        let markup = format!("<p>A Quiet Morning</p>{FILLER}");
        assert_eq!(
            find(HeadingRule::IsolatedLine, &markup).as_deref(),
            Some("A Quiet Morning")
        );
        let markup = format!("<p>He left.</p>{FILLER}");
        assert_eq!(find(HeadingRule::IsolatedLine, &markup), None);
    }

    #[test]
    fn test_heading_class_must_be_short() {
        let long = format!(r#"<div class="chapter">{FILLER}{FILLER}</div>"#);
        assert_eq!(find(HeadingRule::HeadingClass, &long), None);
        let nested = format!(r#"<div class="chapter">{FILLER}{FILLER}<h2 class="chapter-head">The Road</h2></div>"#);
        assert_eq!(find(HeadingRule::HeadingClass, &nested), None);
        assert_eq!(
            find(HeadingRule::HeadingClass, r#"<section class="Chapter_Heading"><p>Two</p></section>"#).as_deref(),
            Some("Two")
        );
    }

    #[test]
    fn test_continued_paragraph_is_not_a_line() {
        let markup = format!("<html><head></head><body><p>Quiet Morning</p>{FILLER}</body></html>");
        let page = Page::continued(0, markup.clone(), "<p>".len());
        assert!(fresh_lines(&page).iter().all(|line| line != "Quiet Morning"));

        let page = Page::new(0, markup);
        assert_eq!(fresh_lines(&page)[0], "Quiet Morning");
    }

    #[test]
    fn test_class_wrapped_unit_yields_markers() {
        let paragraphs: String = (0..40)
            .map(|i| format!("<p>paragraph number {i} continues the long story of the quiet town.</p>"))
            .collect();
        let units = vec![ContentUnit {
            href: "story.xhtml".into(),
            title: None,
            body: UnitBody::Markup(format!(r#"<div class="chapter">{paragraphs}</div>"#)),
        }];
        let pages = Paginator::new(200).paginate_units(&units).pages;
        assert!(pages.len() > 10);
        assert!(pages[5].markup().contains(r#"<div class="chapter">"#));

        let toc = detect_headings(&pages, &EngineConfig::default(), &Deadline::never());
        assert_eq!(toc, position_markers(pages.len()));
    }

    #[test]
    fn test_detect_headings_dedupes_nearby_pages() {
        let mut bodies = vec![FILLER.to_string(); 10];
        for (i, title) in [(0, "One"), (3, "Two"), (6, "Three"), (7, "Extra"), (9, "Four")] {
            bodies[i] = format!("<h1>{title}</h1>");
        }
        let bodies: Vec<&str> = bodies.iter().map(String::as_str).collect();
        let toc = detect_headings(&pages(&bodies), &EngineConfig::default(), &Deadline::never());
        let found: Vec<_> = toc.iter().map(|t| (t.title.as_str(), t.page, t.level)).collect();
        assert_eq!(found, vec![("One", 1, 1), ("Two", 4, 1), ("Three", 7, 1), ("Four", 10, 1)]);
    }

    #[test]
    fn test_detect_headings_respects_cap() {
        let bodies: Vec<&str> = vec!["<h2>Heading</h2>"; 40];
        let config = EngineConfig::default().with_max_toc_entries(5);
        let toc = detect_headings(&pages(&bodies), &config, &Deadline::never());
        assert_eq!(toc.len(), 5);
        assert_eq!(toc[1].page, 4);
    }

    #[test]
    fn test_too_few_headings_become_markers() {
        let bodies = vec![FILLER; 10];
        let toc = detect_headings(&pages(&bodies), &EngineConfig::default(), &Deadline::never());
        assert_eq!(toc, position_markers(10));
    }

    #[test]
    fn test_expired_deadline_becomes_markers() {
        let bodies = vec!["<h1>Heading</h1>"; 10];
        let expired = Deadline::after(Some(std::time::Duration::ZERO));
        let toc = detect_headings(&pages(&bodies), &EngineConfig::default(), &expired);
        assert_eq!(toc, position_markers(10));
    }

    #[test]
    fn test_position_markers() {
        assert_eq!(position_markers(0), vec![TocItem::new("Start of book", 1, 1)]);
        assert_eq!(position_markers(1), vec![TocItem::new("Start of book", 1, 1)]);

        let markers = position_markers(10);
        assert_eq!(markers.len(), 10);
        assert_eq!(markers[1], TocItem::new("10%", 2, 1));
        assert_eq!(markers[9], TocItem::new("End of book", 10, 1));

        let markers = position_markers(95);
        assert_eq!(markers[1], TocItem::new("10%", 11, 1));
        assert!(markers.windows(2).all(|w| w[0].page < w[1].page));
        assert_eq!(markers.last().map(|m| m.page), Some(95));
    }
}
