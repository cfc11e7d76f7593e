//! Lenient tag tokenizer for (X)HTML fragments.
//!
//! The tokenizer never fails: anything that does not form a complete tag is
//! reported as text. A lone `<` therefore comes back as `Token::Text("<")`.

use std::borrow::Cow;

use memchr::memchr;

/// Elements with no content model; they never take a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// A start or end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Lowercased element name.
    pub name: Cow<'a, str>,
    /// The tag exactly as written, including angle brackets.
    pub raw: &'a str,
    /// Written as `<name ... />`.
    pub self_closing: bool,
}

impl<'a> Tag<'a> {
    /// True when the tag opens no element that needs closing.
    pub fn is_empty_element(&self) -> bool {
        self.self_closing || is_void_element(&self.name)
    }

    /// Raw value of attribute `name` (ASCII case-insensitive), entities left encoded.
    ///
    /// Namespaced attributes match on the full written name, so `epub:type`
    /// must be asked for as such.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        let raw = self.raw;
        let bytes = raw.as_bytes();
        let mut i = 1 + bytes.iter().skip(1).position(|&b| !is_name_byte(b) && b != b'/')?;
        let end = raw.len().saturating_sub(1);

        while i < end {
            while i < end && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
                i += 1;
            }
            let key_start = i;
            while i < end && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/') {
                i += 1;
            }
            let key = &raw[key_start..i];
            while i < end && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= end || bytes[i] != b'=' {
                if key.is_empty() {
                    i += 1;
                }
                continue;
            }
            i += 1;
            while i < end && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let value = match bytes.get(i) {
                Some(&q @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    let len = memchr(q, &bytes[start..end]).unwrap_or(end - start);
                    i = start + len + 1;
                    &raw[start..start + len]
                }
                _ => {
                    let start = i;
                    while i < end && !bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    &raw[start..i]
                }
            };

            if key.eq_ignore_ascii_case(name) {
                return Some(value);
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// Content of `script`/`style` elements, passed through untouched.
    RawText(&'a str),
    Start(Tag<'a>),
    End(Tag<'a>),
    /// Comments and CDATA sections.
    Comment(&'a str),
    /// Doctype and processing instructions.
    Declaration(&'a str),
}

pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    raw_until: Option<&'static str>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_until: None,
        }
    }
}

pub fn tokenize(src: &str) -> Tokenizer<'_> {
    Tokenizer::new(src)
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.src[self.pos..];
        if rest.is_empty() {
            return None;
        }

        if let Some(closer) = self.raw_until.take() {
            let end = find_ignore_ascii_case(rest, closer).unwrap_or(rest.len());
            if end > 0 {
                self.pos += end;
                return Some(Token::RawText(&rest[..end]));
            }
        }

        if rest.starts_with('<') {
            if let Some((token, len)) = parse_markup(rest) {
                self.pos += len;
                if let Token::Start(tag) = &token
                    && !tag.self_closing
                {
                    self.raw_until = match &*tag.name {
                        "script" => Some("</script"),
                        "style" => Some("</style"),
                        _ => None,
                    };
                }
                return Some(token);
            }
            self.pos += 1;
            return Some(Token::Text(&rest[..1]));
        }

        let end = memchr(b'<', rest.as_bytes()).unwrap_or(rest.len());
        self.pos += end;
        Some(Token::Text(&rest[..end]))
    }
}

fn parse_markup(rest: &str) -> Option<(Token<'_>, usize)> {
    let bytes = rest.as_bytes();

    if rest.starts_with("<!--") {
        let end = rest[4..].find("-->")? + 4 + 3;
        return Some((Token::Comment(&rest[..end]), end));
    }
    if rest.starts_with("<![CDATA[") {
        let end = rest[9..].find("]]>")? + 9 + 3;
        return Some((Token::Comment(&rest[..end]), end));
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        let end = memchr(b'>', bytes)? + 1;
        return Some((Token::Declaration(&rest[..end]), end));
    }

    let (is_end, name_start) = if rest.starts_with("</") { (true, 2) } else { (false, 1) };
    if !bytes.get(name_start)?.is_ascii_alphabetic() {
        return None;
    }

    let name_len = bytes[name_start..]
        .iter()
        .position(|&b| !is_name_byte(b))
        .unwrap_or(bytes.len() - name_start);
    let name = &rest[name_start..name_start + name_len];

    let close = find_tag_end(bytes, name_start + name_len)?;
    let raw = &rest[..=close];
    let tag = Tag {
        name: lowercase(name),
        raw,
        self_closing: !is_end && raw[..raw.len() - 1].trim_end().ends_with('/'),
    };

    let token = if is_end { Token::End(tag) } else { Token::Start(tag) };
    Some((token, close + 1))
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut last_significant = 0u8;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                    last_significant = b;
                }
            }
            None => match b {
                b'"' | b'\'' if last_significant == b'=' => quote = Some(b),
                b'>' => return Some(i),
                b'<' => return None,
                _ if b.is_ascii_whitespace() => {}
                _ => last_significant = b,
            },
        }
    }
    None
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'-' | b'_' | b'.')
}

fn lowercase(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    let mut from = 0;
    while let Some(offset) = memchr(needle[0], &hay[from..]) {
        let at = from + offset;
        if hay.len() - at >= needle.len() && hay[at..at + needle.len()].eq_ignore_ascii_case(needle) {
            return Some(at);
        }
        from = at + 1;
    }
    None
}
