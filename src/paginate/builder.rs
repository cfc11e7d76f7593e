//! Page assembly over a balanced token stream.

use crate::markup::{Tag, Token, tokenize, visible_len};

use super::split::{first_break, split_point};

pub(crate) const PAGE_OPEN: &str = "<html><head></head><body>";
pub(crate) const PAGE_CLOSE: &str = "</body></html>";

/// Accumulates tokens into pages of bounded visible length.
///
/// Elements still open when a page is cut are closed at the end of that page
/// and reopened, with their original attributes, at the start of the next.
pub(crate) struct PageBuilder<'a> {
    limit: usize,
    /// Finished pages with the byte length of their reopened-tag prefix.
    pages: Vec<(String, usize)>,
    buf: String,
    /// Bytes at the start of `buf` that reopen elements from the previous page.
    reopened: usize,
    used: usize,
    has_content: bool,
    stack: Vec<Tag<'a>>,
    /// Buffer offset and stack depth where a run of start tags with no
    /// content after them began. Such a run moves to the next page on a cut.
    pending: Option<(usize, usize)>,
}

impl<'a> PageBuilder<'a> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            pages: Vec::new(),
            buf: String::new(),
            reopened: 0,
            used: 0,
            has_content: false,
            stack: Vec::new(),
            pending: None,
        }
    }

    /// Feed balanced body markup.
    pub fn push_markup(&mut self, body: &'a str) {
        for token in tokenize(body) {
            self.push_token(token);
        }
    }

    fn push_token(&mut self, token: Token<'a>) {
        match token {
            Token::Text(text) if text.trim().is_empty() => self.buf.push_str(text),
            Token::Text(text) => self.push_text(text),
            Token::Start(tag) => {
                if tag.is_empty_element() {
                    self.buf.push_str(tag.raw);
                    self.pending = None;
                    if tag.name == "img" {
                        self.has_content = true;
                    }
                    return;
                }
                if self.has_content && self.used >= self.limit {
                    self.flush();
                }
                if self.pending.is_none() {
                    self.pending = Some((self.buf.len(), self.stack.len()));
                }
                self.buf.push_str(tag.raw);
                self.stack.push(tag);
            }
            Token::End(tag) => {
                if self.stack.last().is_some_and(|open| open.name == tag.name) {
                    self.stack.pop();
                    self.buf.push_str(tag.raw);
                    self.pending = None;
                }
            }
            Token::RawText(raw) | Token::Comment(raw) => self.buf.push_str(raw),
            Token::Declaration(_) => {}
        }
    }

    fn push_text(&mut self, mut text: &str) {
        while !text.is_empty() {
            let len = visible_len(text);
            let room = self.limit.saturating_sub(self.used);

            if len <= room {
                self.append(text, len);
                return;
            }

            if self.has_content && len <= self.limit {
                self.flush();
                continue;
            }

            let cut = match split_point(text, room) {
                Some(at) => at,
                None if self.has_content => {
                    self.flush();
                    continue;
                }
                None => first_break(text),
            };

            let (head, tail) = text.split_at(cut);
            self.append(head, visible_len(head));
            self.flush();
            text = tail;
        }
    }

    fn append(&mut self, text: &str, len: usize) {
        self.buf.push_str(text);
        self.used += len;
        if !text.trim().is_empty() {
            self.has_content = true;
            self.pending = None;
        }
    }

    /// Close the current page if it holds anything visible.
    fn flush(&mut self) {
        if !self.has_content {
            return;
        }

        let (cut, keep) = self
            .pending
            .take()
            .unwrap_or((self.buf.len(), self.stack.len()));
        let carried = self.buf.split_off(cut);

        let mut page = String::with_capacity(PAGE_OPEN.len() + self.buf.len() + PAGE_CLOSE.len() + 32);
        page.push_str(PAGE_OPEN);
        page.push_str(&self.buf);
        for tag in self.stack[..keep].iter().rev() {
            page.push_str("</");
            page.push_str(&tag.name);
            page.push('>');
        }
        page.push_str(PAGE_CLOSE);
        self.pages.push((page, self.reopened));

        self.buf.clear();
        for tag in &self.stack[..keep] {
            self.buf.push_str(tag.raw);
        }
        self.reopened = self.buf.len();
        self.buf.push_str(&carried);
        self.used = 0;
        self.has_content = false;
    }

    /// Finished pages, each paired with the length in bytes of the markup
    /// right after the page shell that reopens elements cut by the previous
    /// page.
    pub fn finish(mut self) -> Vec<(String, usize)> {
        self.flush();
        self.pages
    }
}
