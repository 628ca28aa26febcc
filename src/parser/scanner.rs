//! Delimiter scanning: locating `$` runs and deciding which of them can
//! open or close a math span.
//!
//! Dollar signs are also currency, so most of the work here is refusing to
//! treat `200$ + 500$` or `y$+500$` as math. The rules are a small set of
//! named predicates over the character on either side of a delimiter.

use nom::{
    bytes::complete::tag,
    character::complete::space0,
    combinator::{eof, value},
    sequence::tuple,
    IResult,
};
use unicode_categories::UnicodeCategories;

/// Number of `$` characters in a delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    /// `$`
    Single,
    /// `$$`
    Double,
}

impl RunLength {
    pub fn len(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }
}

/// An unescaped `$` or `$$` located in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterCandidate {
    /// Byte offset of the first `$`
    pub position: usize,
    pub run: RunLength,
    /// Character before the run, `None` at the start of the text
    pub preceding: Option<char>,
    /// Character after the run, `None` at the end of the text
    pub following: Option<char>,
    /// The run is followed by a digit and then whitespace, as in `$5 each`
    pub price_like: bool,
}

impl DelimiterCandidate {
    /// Byte offset one past the run.
    pub fn end(&self) -> usize {
        self.position + self.run.len()
    }
}

/// Lazily scan `text` for delimiter candidates.
///
/// The scanner holds no state beyond its cursor, so cloning it restarts
/// the scan from the same point.
pub fn scan(text: &str) -> Scanner<'_> {
    Scanner { text, pos: 0 }
}

/// Iterator over the [`DelimiterCandidate`]s of a text, in source order.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Scanner<'a> {
    type Item = DelimiterCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let position = self.pos + self.text[self.pos..].find('$')?;

            if is_escaped(self.text, position) {
                self.pos = position + 1;
                continue;
            }

            let run = if self.text[position + 1..].starts_with('$') {
                RunLength::Double
            } else {
                RunLength::Single
            };
            let end = position + run.len();
            self.pos = end;

            let mut after = self.text[end..].chars();
            let following = after.next();
            let price_like = following.is_some_and(|c| c.is_ascii_digit())
                && after.next().is_some_and(char::is_whitespace);

            return Some(DelimiterCandidate {
                position,
                run,
                preceding: self.text[..position].chars().next_back(),
                following,
                price_like,
            });
        }
    }
}

/// Whether the byte at `position` is preceded by an odd number of backslashes.
pub fn is_escaped(text: &str, position: usize) -> bool {
    let backslashes = text.as_bytes()[..position]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

/// Whether a character may sit directly against a delimiter.
///
/// Text edges, whitespace and punctuation are safe; letters, digits and
/// another `$` are not.
pub fn is_safe_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some('$') => false,
        Some(c) => c.is_whitespace() || c.is_ascii_punctuation() || c.is_punctuation(),
    }
}

/// Whether a candidate can start an inline span.
///
/// `$5 and $` is two prices, not a formula.
pub fn can_open(candidate: &DelimiterCandidate) -> bool {
    candidate.run == RunLength::Single
        && candidate.following.is_some()
        && !candidate.price_like
        && is_safe_boundary(candidate.preceding)
}

/// Whether a candidate can end an inline span.
pub fn can_close(candidate: &DelimiterCandidate) -> bool {
    candidate.run == RunLength::Single && is_safe_boundary(candidate.following)
}

/// Pair up the inline delimiters of a text.
///
/// An opener is closed by the very next candidate or not at all; when that
/// candidate cannot close, it is tried as an opener in turn.
pub fn inline_pairs(text: &str) -> Vec<(DelimiterCandidate, DelimiterCandidate)> {
    let mut pairs = Vec::new();
    let mut candidates = scan(text).peekable();

    while let Some(open) = candidates.next() {
        if !can_open(&open) {
            continue;
        }
        match candidates.peek() {
            Some(close) if can_close(close) => {
                pairs.push((open, *close));
                candidates.next();
            }
            _ => tracing::debug!(position = open.position, "unmatched math delimiter"),
        }
    }

    pairs
}

/// Match a line holding nothing but a `$$` block delimiter.
pub fn block_marker(line: &str) -> IResult<&str, ()> {
    value((), tuple((space0, tag("$$"), space0, eof)))(line)
}

/// Whether a line opens or closes a block span.
pub fn is_block_marker(line: &str) -> bool {
    block_marker(line).is_ok()
}
