//! Markup handling: tokenizing, repair and visible-text extraction.

mod normalize;
mod text;
mod tokenizer;

pub use normalize::{NormalizedMarkup, normalize, normalize_parts};
pub use text::{block_lines, is_block_element, strip_tags, visible_len};
pub use tokenizer::{Tag, Token, Tokenizer, VOID_ELEMENTS, is_void_element, tokenize};

/// True when every element opened in `markup` is closed in it, in order.
///
/// A close tag that does not match the innermost open element makes the
/// markup unbalanced.
pub fn is_balanced(markup: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    for token in tokenize(markup) {
        match token {
            Token::Start(tag) if !tag.is_empty_element() => stack.push(tag.name.into_owned()),
            Token::End(tag) => {
                if stack.pop().as_deref() != Some(&*tag.name) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("<p><b>x</b></p>"));
        assert!(is_balanced("<p>a<br>b<img src=x /></p>"));
        assert!(!is_balanced("<p><b>x</p>"));
        assert!(!is_balanced("<p>x"));
        assert!(!is_balanced("x</p>"));
    }
}
