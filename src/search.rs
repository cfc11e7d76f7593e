//! Case-insensitive page search and match highlighting.
//!
//! Both operations are stateless: there is no index, every call rescans the
//! pages it is given.

use regex::{Captures, RegexBuilder};

use crate::markup::strip_tags;
use crate::paginate::Page;
use crate::util::escape_html;

/// Class of the `<span>` wrapped around highlighted matches.
pub const HIGHLIGHT_CLASS: &str = "search-highlight";

/// 0-based indices of the pages whose visible text contains `query`,
/// ignoring case. An empty query matches nothing.
///
/// ```
/// use folio::Page;
/// use folio::search::search;
///
/// let pages = vec![
///     Page::new(0, "<p>Call me Ishmael.</p>".into()),
///     Page::new(1, "<p>Some years <i>ago</i></p>".into()),
/// ];
/// assert_eq!(search(&pages, "ISHMAEL"), vec![0]);
/// assert_eq!(search(&pages, "years ago"), vec![1]);
/// ```
pub fn search(pages: &[Page], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    pages
        .iter()
        .filter(|page| strip_tags(page.markup()).to_lowercase().contains(&needle))
        .map(Page::index)
        .collect()
}

/// Wrap every case-insensitive occurrence of `query` in `markup` with a
/// highlight span.
///
/// Tags and entity references are left untouched, so an occurrence that
/// straddles a tag boundary (`wh<b>ale</b>`) is not highlighted.
pub fn highlight(markup: &str, query: &str) -> String {
    if query.is_empty() {
        return markup.to_string();
    }

    let pattern = format!(
        "(<[^>]*>)|({})|&[#A-Za-z0-9]+;",
        regex::escape(&escape_html(query))
    );
    let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            log::warn!("cannot highlight {query:?}: {e}");
            return markup.to_string();
        }
    };

    re.replace_all(markup, |caps: &Captures| match caps.get(2) {
        Some(hit) => format!(r#"<span class="{HIGHLIGHT_CLASS}">{}</span>"#, hit.as_str()),
        None => caps[0].to_string(),
    })
    .into_owned()
}
