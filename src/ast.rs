//! Document tree produced by the block splitter and filled in by span extraction.

use std::ops::Range;

/// A document split into blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Iterate over every math node in source order.
    pub fn math_nodes(&self) -> impl Iterator<Item = &MathNode> {
        self.blocks.iter().flat_map(|block| {
            let (own, inlines): (Option<&MathNode>, &[Inline]) = match block {
                Block::Math(node) => (Some(node), [].as_slice()),
                Block::Paragraph(para) => (None, para.inlines.as_slice()),
            };
            own.into_iter().chain(inlines.iter().filter_map(|inline| match inline {
                Inline::Math(node) => Some(node),
                _ => None,
            }))
        })
    }

    /// Mutable access to every math node in source order.
    pub fn math_nodes_mut(&mut self) -> Vec<&mut MathNode> {
        let mut nodes = Vec::new();
        for block in &mut self.blocks {
            match block {
                Block::Math(node) => nodes.push(node),
                Block::Paragraph(para) => {
                    for inline in &mut para.inlines {
                        if let Inline::Math(node) = inline {
                            nodes.push(node);
                        }
                    }
                }
            }
        }
        nodes
    }
}

/// Block-level elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A run of prose lines
    Paragraph(Paragraph),

    /// A `$$` ... `$$` span occupying whole lines
    Math(MathNode),
}

/// A paragraph and the text it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub segment: RawSegment,
    pub inlines: Vec<Inline>,
    /// Set once inline spans have been extracted from `segment`.
    pub extracted: bool,
}

impl Paragraph {
    /// A paragraph whose inline content has not been scanned yet.
    pub fn new(segment: RawSegment) -> Self {
        let inlines = vec![Inline::Text(segment.text.clone())];
        Self {
            segment,
            inlines,
            extracted: false,
        }
    }
}

/// Inline-level elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text
    Text(String),

    /// Inline math
    Math(MathNode),

    /// A line break inside a paragraph
    LineBreak,
}

/// A contiguous slice of document text between block boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    /// Byte offset of the first character in the source document
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    pub text: String,
}

impl RawSegment {
    pub fn new(source: &str, range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            text: source[range].to_string(),
        }
    }
}

/// Whether a span renders inline with text or as its own block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathMode {
    Inline,
    Block,
}

impl MathMode {
    pub fn is_display(self) -> bool {
        self == Self::Block
    }

    /// CSS class naming the display style on a rendered container.
    pub fn container_class(self) -> &'static str {
        match self {
            Self::Inline => "inline-math",
            Self::Block => "block-math",
        }
    }
}

/// An accepted math region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    pub mode: MathMode,
    /// Text between the delimiters, escapes untouched
    pub content: String,
    /// Byte range of the span, delimiters included, in the source document
    pub source: Range<usize>,
}

/// A math span as it sits in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MathNode {
    pub span: MathSpan,
    /// Set once a renderer has produced markup for this node.
    pub processed: bool,
    /// Typeset output; `None` renders the span as its literal text.
    pub rendered: Option<Typeset>,
}

impl MathNode {
    pub fn new(span: MathSpan) -> Self {
        Self {
            span,
            processed: false,
            rendered: None,
        }
    }

    pub fn mode(&self) -> MathMode {
        self.span.mode
    }

    pub fn content(&self) -> &str {
        &self.span.content
    }
}

/// Markup returned by a renderer for one span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typeset {
    pub markup: String,
    /// Engine-specific class added to the container (e.g. `katex-math`)
    pub engine_class: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(content: &str, mode: MathMode) -> MathNode {
        MathNode::new(MathSpan {
            mode,
            content: content.to_string(),
            source: 0..content.len(),
        })
    }

    #[test]
    fn test_math_nodes_in_source_order() {
        let mut para = Paragraph::new(RawSegment::new("a $x$ b $y$", 0..11));
        para.inlines = vec![
            Inline::Text("a ".into()),
            Inline::Math(node("x", MathMode::Inline)),
            Inline::Text(" b ".into()),
            Inline::Math(node("y", MathMode::Inline)),
        ];
        let doc = Document {
            blocks: vec![
                Block::Paragraph(para),
                Block::Math(node("z", MathMode::Block)),
            ],
        };

        let contents: Vec<&str> = doc.math_nodes().map(MathNode::content).collect();
        assert_eq!(contents, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_math_nodes_mut() {
        let mut doc = Document {
            blocks: vec![Block::Math(node("z", MathMode::Block))],
        };
        for node in doc.math_nodes_mut() {
            node.processed = true;
        }
        assert!(doc.math_nodes().all(|n| n.processed));
    }

    #[test]
    fn test_raw_segment() {
        let seg = RawSegment::new("one\ntwo", 4..7);
        assert_eq!(seg.text, "two");
        assert_eq!((seg.start, seg.end), (4, 7));
    }
}
