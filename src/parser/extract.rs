//! Span extraction: turning accepted delimiter pairs into math nodes.

use std::borrow::Cow;

use crate::ast::{Block, Document, Inline, MathMode, MathNode, MathSpan, RawSegment};
use crate::error::MalformedSpan;
use crate::parser::scanner::{inline_pairs, is_escaped, scan, DelimiterCandidate, RunLength};

/// Slice the span delimited by `open` and `close` out of `text`.
///
/// `offset` is the position of `text` in the source document and is only
/// used to report source ranges. Block spans drop the rest of the opening
/// marker line and the closing marker line, keeping the lines in between
/// verbatim.
pub fn extract(
    text: &str,
    offset: usize,
    open: &DelimiterCandidate,
    close: &DelimiterCandidate,
) -> Result<MathSpan, MalformedSpan> {
    if open.run != close.run {
        return Err(MalformedSpan::RunMismatch);
    }
    if close.position < open.end() {
        return Err(MalformedSpan::Inverted);
    }

    let inner = &text[open.end()..close.position];
    let (mode, content_start, content) = match open.run {
        RunLength::Single => (MathMode::Inline, open.end(), inner),
        RunLength::Double => {
            let (start, end) = match (inner.find('\n'), inner.rfind('\n')) {
                (Some(first), Some(last)) if first < last => (first + 1, last),
                _ => (inner.len(), inner.len()),
            };
            (MathMode::Block, open.end() + start, &inner[start..end])
        }
    };

    if let Some(nested) = scan(content).find(|c| c.run.len() >= open.run.len()) {
        return Err(MalformedSpan::NestedDelimiter {
            position: offset + content_start + nested.position,
        });
    }

    Ok(MathSpan {
        mode,
        content: content.to_string(),
        source: offset + open.position..offset + close.end(),
    })
}

/// Split a paragraph into text, line breaks and inline math nodes.
pub fn extract_inlines(segment: &RawSegment) -> Vec<Inline> {
    let text = segment.text.as_str();
    let mut inlines = Vec::new();
    let mut cursor = 0;

    for (open, close) in inline_pairs(text) {
        match extract(text, segment.start, &open, &close) {
            Ok(span) => {
                push_text(&mut inlines, &text[cursor..open.position]);
                inlines.push(Inline::Math(MathNode::new(span)));
                cursor = close.end();
            }
            Err(err) => {
                tracing::debug!(position = segment.start + open.position, %err, "leaving math span as text");
            }
        }
    }

    push_text(&mut inlines, &text[cursor..]);
    inlines
}

/// Extract inline spans from every paragraph that has not been scanned yet.
///
/// Paragraphs are marked once scanned, so a second call changes nothing.
pub fn extract_spans(document: &mut Document) {
    for block in &mut document.blocks {
        if let Block::Paragraph(para) = block {
            if para.extracted {
                continue;
            }
            para.inlines = extract_inlines(&para.segment);
            para.extracted = true;
        }
    }
}

fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    let mut lines = text.split('\n').peekable();
    while let Some(line) = lines.next() {
        if !line.is_empty() {
            inlines.push(Inline::Text(unescape_dollars(line).into_owned()));
        }
        if lines.peek().is_some() {
            inlines.push(Inline::LineBreak);
        }
    }
}

/// Replace `\$` with `$` in text outside math spans.
pub fn unescape_dollars(text: &str) -> Cow<'_, str> {
    if !text.contains("\\$") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == '$' && is_escaped(text, i) {
            out.pop();
        }
        out.push(c);
    }
    Cow::Owned(out)
}
