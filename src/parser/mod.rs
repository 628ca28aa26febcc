//! Parsing: splitting source text into blocks and finding math spans in them.

mod block;
pub mod extract;
pub mod scanner;

pub use block::parse_blocks;
pub use extract::{extract, extract_inlines, extract_spans};
pub use scanner::{scan, DelimiterCandidate, RunLength, Scanner};

use crate::ast::Document;
use std::borrow::Cow;

/// Split a document into paragraphs and `$$` math blocks.
///
/// Inline spans are not looked for yet; see [`extract_spans`]. Offsets in
/// the result refer to the input with `\r\n` line endings folded to `\n`.
pub fn parse(input: &str) -> Document {
    let input = normalize_newlines(input);
    Document {
        blocks: parse_blocks(&input),
    }
}

fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    }
}
