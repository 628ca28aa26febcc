//! Block-level splitting into paragraphs and `$$` math blocks.

use crate::ast::{Block, MathNode, Paragraph, RawSegment};
use crate::parser::extract::extract;
use crate::parser::scanner::{is_block_marker, scan};

/// A line of the source and where it starts.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    text: &'a str,
}

impl Line<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Parse all blocks from content.
pub fn parse_blocks(input: &str) -> Vec<Block> {
    let lines = split_lines(input);
    let mut blocks = Vec::new();
    let mut paragraph_start = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.is_blank() {
            flush_paragraph(input, &lines, &mut paragraph_start, i, &mut blocks);
            i += 1;
            continue;
        }

        let literal = if is_block_marker(line.text) {
            match try_parse_math_block(input, &lines[i..]) {
                Ok((node, consumed)) => {
                    flush_paragraph(input, &lines, &mut paragraph_start, i, &mut blocks);
                    blocks.push(Block::Math(node));
                    i += consumed;
                    continue;
                }
                Err(covered) => covered,
            }
        } else {
            1
        };

        paragraph_start.get_or_insert(i);
        i += literal;
    }

    flush_paragraph(input, &lines, &mut paragraph_start, lines.len(), &mut blocks);
    blocks
}

fn split_lines(input: &str) -> Vec<Line<'_>> {
    let mut start = 0;
    input
        .split('\n')
        .map(|text| {
            let line = Line { start, text };
            start += text.len() + 1;
            line
        })
        .collect()
}

/// Close the open paragraph, if any, at line `end` (exclusive).
fn flush_paragraph(
    input: &str,
    lines: &[Line<'_>],
    start: &mut Option<usize>,
    end: usize,
    blocks: &mut Vec<Block>,
) {
    let Some(first) = start.take() else {
        return;
    };

    let from = lines[first].start;
    let to = lines[end - 1].end();
    let slice = &input[from..to];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();

    let segment = RawSegment::new(input, from + leading..to - trailing);
    blocks.push(Block::Paragraph(Paragraph::new(segment)));
}

/// Try to read a math block opening at `lines[0]`.
///
/// Returns the node and the number of lines consumed. On failure, returns
/// how many lines must stay prose: only the opening line when there is no
/// closing marker, or the whole block through its closing marker when its
/// content is malformed, so that marker never opens another block.
fn try_parse_math_block(input: &str, lines: &[Line<'_>]) -> Result<(MathNode, usize), usize> {
    let opening = lines[0];
    let Some(offset) = lines[1..].iter().position(|line| is_block_marker(line.text)) else {
        tracing::debug!(position = opening.start, "unterminated math block");
        return Err(1);
    };
    let consumed = offset + 2;
    let closing = lines[consumed - 1];

    let text = &input[opening.start..closing.end()];
    let mut candidates = scan(text);
    let (Some(open), Some(close)) = (candidates.next(), candidates.last()) else {
        return Err(consumed);
    };

    match extract(text, opening.start, &open, &close) {
        Ok(span) => Ok((MathNode::new(span), consumed)),
        Err(err) => {
            tracing::debug!(position = opening.start, %err, "leaving math block as text");
            Err(consumed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MathMode;
    use pretty_assertions::assert_eq;

    fn paragraph_text(block: &Block) -> &str {
        match block {
            Block::Paragraph(p) => &p.segment.text,
            other => panic!("Expected paragraph, got {:?}", other),
        }
    }

    fn math_content(block: &Block) -> &str {
        match block {
            Block::Math(node) => {
                assert_eq!(node.mode(), MathMode::Block);
                node.content()
            }
            other => panic!("Expected math block, got {:?}", other),
        }
    }

    #[test]
    fn test_paragraphs() {
        let blocks = parse_blocks("one\ntwo\n\n  three  \n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(paragraph_text(&blocks[0]), "one\ntwo");
        assert_eq!(paragraph_text(&blocks[1]), "three");

        if let Block::Paragraph(p) = &blocks[1] {
            assert_eq!((p.segment.start, p.segment.end), (11, 16));
        }
    }

    #[test]
    fn test_math_block_interrupts_paragraph() {
        let blocks = parse_blocks("I like\n$$\n{a,b}$<a>\n$$\netc\n");
        assert_eq!(blocks.len(), 3);
        assert_eq!(paragraph_text(&blocks[0]), "I like");
        assert_eq!(math_content(&blocks[1]), "{a,b}$<a>");
        assert_eq!(paragraph_text(&blocks[2]), "etc");
    }

    #[test]
    fn test_math_block_with_blank_lines() {
        let blocks = parse_blocks("$$\na\n\nb\n$$");
        assert_eq!(blocks.len(), 1);
        assert_eq!(math_content(&blocks[0]), "a\n\nb");
        if let Block::Math(node) = &blocks[0] {
            assert_eq!(node.span.source, 0..10);
        }
    }

    #[test]
    fn test_unterminated_block_stays_text() {
        let blocks = parse_blocks("$$\na\n\nb");
        assert_eq!(blocks.len(), 2);
        assert_eq!(paragraph_text(&blocks[0]), "$$\na");
        assert_eq!(paragraph_text(&blocks[1]), "b");
    }

    #[test]
    fn test_bad_markers_stay_text() {
        let blocks = parse_blocks("$$a\na\n$$\"\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(paragraph_text(&blocks[0]), "$$a\na\n$$\"");
    }

    #[test]
    fn test_malformed_block_stays_text() {
        let blocks = parse_blocks("$$\na $$ b\n$$");
        assert_eq!(blocks.len(), 1);
        assert_eq!(paragraph_text(&blocks[0]), "$$\na $$ b\n$$");
    }

    #[test]
    fn test_malformed_block_keeps_its_closing_marker() {
        let blocks = parse_blocks("$$\na $$ b\n$$\nplain prose here\n$$");
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            paragraph_text(&blocks[0]),
            "$$\na $$ b\n$$\nplain prose here\n$$"
        );
    }

    #[test]
    fn test_valid_block_after_malformed_one() {
        let blocks = parse_blocks("$$\na $$ b\n$$\n\n$$\nx\n$$");
        assert_eq!(blocks.len(), 2);
        assert_eq!(paragraph_text(&blocks[0]), "$$\na $$ b\n$$");
        assert_eq!(math_content(&blocks[1]), "x");
    }

    #[test]
    fn test_indented_markers() {
        let blocks = parse_blocks("  $$\n  x^2\n  $$  ");
        assert_eq!(math_content(&blocks[0]), "  x^2");
    }
}
