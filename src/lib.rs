//! # markdown-math
//!
//! Finds TeX math in user-authored Markdown and renders it, either in the
//! viewer (client-side, by KaTeX or MathJax) or before display through an
//! external worker process (server-side).
//!
//! ## Syntax
//!
//! - Inline: `$E = mc^2$`
//! - Block: `$$` alone on a line, the formula, then `$$` alone on a later line
//!
//! ```text
//! The area is $\pi r^2$.
//!
//! $$
//! \int_0^1 x\,dx = \frac{1}{2}
//! $$
//! ```
//!
//! Dollar signs are also currency, so an inline delimiter only counts when
//! it is not glued to a letter or digit on its outer side: `$x$` and
//! `($ +500 $)` are math, `200$ + 500$` and `y$+500$` are not. `\$` is a
//! literal dollar sign everywhere. A `$$` block without its closing line is
//! left as plain text.
//!
//! ## Quick Start
//!
//! ```rust
//! use markdown_math::{cook, Context, MathSettings};
//!
//! let html = cook("I like $x^2$ and 200$.", &MathSettings::default(), Context::Post);
//! assert_eq!(html, r#"<p>I like <span class="math">x^2</span> and 200$.</p>"#);
//! ```
//!
//! ## Pipeline
//!
//! 1. [`parse`] splits the text into paragraphs and `$$` blocks.
//! 2. [`extract_spans`] finds inline spans inside paragraphs.
//! 3. [`dispatch`] hands every span to a [`MathRenderer`]:
//!    - [`ClientRenderer`] loads the library assets once and prepares
//!      spans for in-browser typesetting, sharing macros within a pass;
//!    - [`ServerRenderer`] starts a worker per pass and exchanges one JSON
//!      line per span with it.
//! 4. [`render_html`] writes the document back out.
//!
//! Every step is idempotent: already extracted paragraphs and already
//! rendered spans are skipped, and failures leave the affected spans as
//! their literal text.
//!
//! [`ClientRenderer`]: render::math::ClientRenderer
//! [`ServerRenderer`]: render::math::ServerRenderer

pub mod ast;
pub mod config;
pub mod error;
pub mod parser;
pub mod render;

// Convenience re-exports
pub use ast::{Block, Document, Inline, MathMode, MathNode, MathSpan};
pub use config::{Context, MathSettings, Provider, RenderingMode};
pub use error::{Error, RenderError, Result};
pub use parser::{extract_spans, parse};
pub use render::{create_renderer, dispatch, render_html, MathRenderer, PassReport};

/// Turn markup into HTML with math spans tagged but not typeset.
///
/// When math is disabled for `context`, dollar signs are left alone.
pub fn cook(input: &str, settings: &MathSettings, context: Context) -> String {
    let mut doc = parse(input);
    if settings.applies_to(context) {
        extract_spans(&mut doc);
    }
    render_html(&doc)
}

/// Cook markup and typeset its spans with the renderer the settings select.
///
/// # Example
///
/// ```rust
/// use markdown_math::{render, Context, MathSettings, Provider};
///
/// let settings = MathSettings { provider: Provider::KaTeX, ..Default::default() };
/// let html = render("$x$", &settings, Context::Post);
/// assert!(html.contains("katex-math"));
/// ```
pub fn render(input: &str, settings: &MathSettings, context: Context) -> String {
    let mut renderer = create_renderer(settings);
    render_with(input, settings, context, renderer.as_mut())
}

/// Like [`render`], with a caller-supplied renderer.
pub fn render_with(
    input: &str,
    settings: &MathSettings,
    context: Context,
    renderer: &mut dyn MathRenderer,
) -> String {
    let mut doc = parse(input);
    if settings.applies_to(context) {
        extract_spans(&mut doc);
        let report = dispatch(&mut doc, renderer);
        tracing::debug!(?report, "math pass finished");
    }
    render_html(&doc)
}
