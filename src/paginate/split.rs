//! Break-point search inside a single text run.
//!
//! Offsets returned here are byte offsets into the raw (still entity-encoded)
//! run. They always fall just after a whitespace character, so a cut never
//! lands inside a word or an entity reference.

use crate::util::entity_len;

const SENTENCE_END: &[char] = &['.', '!', '?', '…'];

/// A visible character of a raw run: its byte span and the char it renders as,
/// `None` for entity references.
struct Unit {
    end: usize,
    ch: Option<char>,
}

fn units(raw: &str) -> impl Iterator<Item = Unit> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let c = raw[pos..].chars().next()?;
        let (len, ch) = match c {
            '&' => match entity_len(&raw[pos..]) {
                Some(len) => (len, None),
                None => (1, Some('&')),
            },
            c => (c.len_utf8(), Some(c)),
        };
        pos += len;
        Some(Unit { end: pos, ch })
    })
}

fn is_space(ch: Option<char>) -> bool {
    ch.is_some_and(char::is_whitespace)
}

/// Last break point whose prefix holds at most `room` visible characters.
///
/// Sentence ends (`. `, `! `, `? `, `… `) are preferred over plain whitespace.
/// Returns `None` when no break fits, or the only break is the end of `raw`.
pub(crate) fn split_point(raw: &str, room: usize) -> Option<usize> {
    let mut sentence = None;
    let mut word = None;
    let mut prev: Option<char> = None;

    for (count, unit) in units(raw).enumerate() {
        if count + 1 > room || unit.end == raw.len() {
            break;
        }
        if is_space(unit.ch) {
            word = Some(unit.end);
            if prev.is_some_and(|p| SENTENCE_END.contains(&p)) {
                sentence = Some(unit.end);
            }
        }
        prev = unit.ch;
    }

    sentence.or(word)
}

/// First break point in `raw`, or its full length when it is one word.
pub(crate) fn first_break(raw: &str) -> usize {
    let mut seen_word = false;
    for unit in units(raw) {
        if is_space(unit.ch) {
            if seen_word {
                return unit.end;
            }
        } else {
            seen_word = true;
        }
    }
    raw.len()
}
