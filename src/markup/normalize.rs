//! Markup repair.
//!
//! [`normalize`] turns arbitrary, possibly malformed markup into a document
//! whose tags are balanced and which always carries `<html>`, `<head>` and
//! `<body>` wrappers. The transformation is infallible, deterministic and
//! idempotent.

use std::fmt;

use super::tokenizer::{Token, tokenize};

/// Elements that may start an implicit `<head>` before any body content.
const HEAD_ONLY_ELEMENTS: &[&str] = &["base", "link", "meta", "style", "title"];

/// Elements allowed inside `<head>`; anything else ends it.
const HEAD_ELEMENTS: &[&str] = &["base", "link", "meta", "noscript", "script", "style", "title"];

/// A repaired document split into its structural parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMarkup {
    html_open: String,
    head_open: String,
    head: String,
    body_open: String,
    body: String,
    repairs: usize,
}

impl NormalizedMarkup {
    /// Balanced markup inside `<head>`.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Balanced markup inside `<body>`.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of synthesized or dropped tags.
    pub fn repairs(&self) -> usize {
        self.repairs
    }
}

impl fmt::Display for NormalizedMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}</head>{}{}</body></html>",
            self.html_open, self.head_open, self.head, self.body_open, self.body
        )
    }
}

/// Repair `markup` and wrap it in a complete html/head/body shell.
///
/// ```
/// let fixed = folio::markup::normalize("<p><b>text</p>");
/// assert_eq!(fixed, "<html><head></head><body><p><b>text</b></p></body></html>");
/// ```
pub fn normalize(markup: &str) -> String {
    normalize_parts(markup).to_string()
}

/// Like [`normalize`], but keeps the structural parts apart.
pub fn normalize_parts(markup: &str) -> NormalizedMarkup {
    let mut html_open: Option<&str> = None;
    let mut head_open: Option<&str> = None;
    let mut body_open: Option<&str> = None;

    let mut head_tokens = Vec::new();
    let mut body_tokens = Vec::new();

    let mut in_head = false;
    let mut head_depth = 0usize;
    let mut body_has_content = false;

    for token in tokenize(markup) {
        match &token {
            Token::Start(tag) if tag.name == "html" => {
                if html_open.is_none() && !tag.self_closing {
                    html_open = Some(tag.raw);
                }
                continue;
            }
            Token::End(tag) if tag.name == "html" || tag.name == "body" => continue,
            Token::Start(tag) if tag.name == "head" => {
                if body_open.is_none() && !body_has_content {
                    if head_open.is_none() && !tag.self_closing {
                        head_open = Some(tag.raw);
                    }
                    in_head = !tag.self_closing;
                    head_depth = 0;
                }
                continue;
            }
            Token::End(tag) if tag.name == "head" => {
                in_head = false;
                continue;
            }
            Token::Start(tag) if tag.name == "body" => {
                if body_open.is_none() && !tag.self_closing {
                    body_open = Some(tag.raw);
                }
                in_head = false;
                continue;
            }
            Token::Declaration(_) => continue,
            Token::Start(tag)
                if !in_head
                    && body_open.is_none()
                    && !body_has_content
                    && HEAD_ONLY_ELEMENTS.contains(&&*tag.name) =>
            {
                in_head = true;
                head_depth = 0;
            }
            _ => {}
        }

        if in_head {
            let leaves_head = head_depth == 0
                && match &token {
                    Token::Text(text) => !text.trim().is_empty(),
                    Token::Start(tag) => !HEAD_ELEMENTS.contains(&&*tag.name),
                    _ => false,
                };

            if !leaves_head {
                match &token {
                    Token::Start(tag) if !tag.is_empty_element() => head_depth += 1,
                    Token::End(_) => head_depth = head_depth.saturating_sub(1),
                    _ => {}
                }
                head_tokens.push(token);
                continue;
            }
            in_head = false;
        }

        if !matches!(&token, Token::Text(text) if text.trim().is_empty()) {
            body_has_content = true;
        }
        body_tokens.push(token);
    }

    let (head, head_repairs) = repair(&head_tokens);
    let (body, body_repairs) = repair(&body_tokens);

    NormalizedMarkup {
        html_open: html_open.unwrap_or("<html>").to_string(),
        head_open: head_open.unwrap_or("<head>").to_string(),
        head,
        body_open: body_open.unwrap_or("<body>").to_string(),
        body,
        repairs: head_repairs + body_repairs,
    }
}

/// Balance a token run with an open-element stack.
///
/// - a close tag matching the top pops it;
/// - a close tag matching a deeper element first closes every element above it;
/// - a close tag matching nothing is dropped;
/// - elements still open at the end are closed innermost first.
fn repair(tokens: &[Token<'_>]) -> (String, usize) {
    let mut out = String::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut repairs = 0;

    for token in tokens {
        match token {
            Token::Text(text) => {
                if text.contains('<') {
                    out.push_str(&text.replace('<', "&lt;"));
                } else {
                    out.push_str(text);
                }
            }
            Token::RawText(raw) | Token::Comment(raw) | Token::Declaration(raw) => out.push_str(raw),
            Token::Start(tag) => {
                out.push_str(tag.raw);
                if !tag.is_empty_element() {
                    stack.push(&*tag.name);
                }
            }
            Token::End(tag) => match stack.iter().rposition(|&open| open == tag.name) {
                Some(at) => {
                    for open in stack.drain(at + 1..).rev() {
                        close(&mut out, open);
                        repairs += 1;
                    }
                    stack.pop();
                    out.push_str(tag.raw);
                }
                None => repairs += 1,
            },
        }
    }

    for open in stack.drain(..).rev() {
        close(&mut out, open);
        repairs += 1;
    }

    (out, repairs)
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
