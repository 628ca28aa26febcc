//! HTML output for a processed document.

use crate::ast::{Block, Document, Inline, MathMode, MathNode};
use crate::render::escape_html;

/// Render a document to an HTML fragment.
///
/// Math nodes that were never typeset are written in their cooked form
/// (`<span class="math">` / `<div class="math">` around the escaped
/// source) so a client-side pass can still find them.
pub fn render_html(document: &Document) -> String {
    document
        .blocks
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(para) => {
            let mut html = String::from("<p>");
            for inline in &para.inlines {
                render_inline(inline, &mut html);
            }
            html.push_str("</p>");
            html
        }
        Block::Math(node) => render_math(node),
    }
}

fn render_inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => {
            let escaped = escape_html(text);
            out.push_str(&escaped.replace('\n', "<br>\n"));
        }
        Inline::LineBreak => out.push_str("<br>\n"),
        Inline::Math(node) => out.push_str(&render_math(node)),
    }
}

/// Render one math node, typeset or not.
pub fn render_math(node: &MathNode) -> String {
    let tag = match node.mode() {
        MathMode::Inline => "span",
        MathMode::Block => "div",
    };

    match &node.rendered {
        Some(typeset) => format!(
            r#"<{tag} class="math math-container {} {}">{}</{tag}>"#,
            node.mode().container_class(),
            typeset.engine_class,
            typeset.markup,
        ),
        None => {
            let content = escape_html(node.content());
            match node.mode() {
                MathMode::Inline => format!(r#"<span class="math">{}</span>"#, content),
                MathMode::Block => format!("<div class=\"math\">\n{}\n</div>", content),
            }
        }
    }
}
