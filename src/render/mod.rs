//! Rendering layer: dispatching math spans to a typesetter and writing HTML.

pub mod html;
pub mod math;

pub use html::render_html;
pub use math::{create_renderer, dispatch, MathRenderer, PassReport};

/// Escape the characters HTML treats as markup.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
