//! Visible-text extraction from markup.

use crate::util::{collapse_whitespace, decode_entities, entity_len, resolve_entity};

use super::tokenizer::{Token, tokenize};

/// Elements that start a new visual line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

pub fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Remove all markup, returning the decoded text a reader would see.
///
/// Text inside `<head>`, comments, scripts and styles is not visible and is
/// dropped. No separators are inserted between elements.
pub fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len() / 2);
    let mut in_head = false;

    for token in tokenize(markup) {
        match token {
            Token::Start(tag) if tag.name == "head" && !tag.self_closing => in_head = true,
            Token::End(tag) if tag.name == "head" => in_head = false,
            Token::Start(tag) if tag.name == "body" => in_head = false,
            Token::Text(text) if !in_head => out.push_str(&decode_entities(text)),
            _ => {}
        }
    }

    out
}

/// Count visible characters of a raw text run. A resolvable entity
/// reference counts as one character; anything else counts as written.
pub fn visible_len(raw: &str) -> usize {
    let mut count = 0;
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        let step = if c == '&' {
            entity_len(rest)
                .filter(|&len| resolve_entity(&rest[1..len - 1]).is_some())
                .unwrap_or(1)
        } else {
            c.len_utf8()
        };
        count += 1;
        rest = &rest[step..];
    }
    count
}

/// Split visible text into lines at block-element boundaries.
///
/// Each returned line is whitespace-collapsed and non-empty.
pub fn block_lines(markup: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_head = false;

    let flush = |current: &mut String, lines: &mut Vec<String>| {
        let line = collapse_whitespace(current);
        if !line.is_empty() {
            lines.push(line);
        }
        current.clear();
    };

    for token in tokenize(markup) {
        match token {
            Token::Start(tag) if tag.name == "head" && !tag.self_closing => in_head = true,
            Token::End(tag) if tag.name == "head" => in_head = false,
            Token::Start(tag) | Token::End(tag) if is_block_element(&tag.name) => {
                flush(&mut current, &mut lines);
            }
            Token::Text(text) if !in_head => current.push_str(&decode_entities(text)),
            _ => {}
        }
    }
    flush(&mut current, &mut lines);

    lines
}
