//! Math rendering backends and the pass that feeds spans to them.

mod client;
mod server;

pub use self::client::{
    provider_assets, Asset, AssetKind, AssetLoader, ClientMarkup, ClientRenderer, HeadAssets,
    Macros, TypesetOptions, Typesetter,
};
pub use self::server::{format_token, ServerRenderer, WorkerProcess};

use crate::ast::{Document, MathMode, Typeset};
use crate::config::{MathSettings, RenderingMode};
use crate::error::RenderError;

/// Trait for math renderers.
///
/// A renderer sees one pass at a time: `begin_pass`, then `render` for
/// each span in source order, then `end_pass`.
pub trait MathRenderer {
    /// Class added to containers holding this renderer's output.
    fn engine_class(&self) -> &'static str;

    /// Prepare for a pass. Only called when the document has spans to render.
    fn begin_pass(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Render one span.
    fn render(&mut self, content: &str, mode: MathMode) -> Result<String, RenderError>;

    /// Release whatever the pass acquired.
    fn end_pass(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Get any required HTML head content (scripts, styles).
    fn head_content(&self) -> Option<String> {
        None
    }
}

/// Create the renderer selected by the settings.
pub fn create_renderer(settings: &MathSettings) -> Box<dyn MathRenderer> {
    match settings.rendering {
        RenderingMode::Client => Box::new(ClientRenderer::new(settings)),
        RenderingMode::Server => Box::new(ServerRenderer::new(settings)),
    }
}

/// What happened during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub rendered: usize,
    pub failed: usize,
    /// Spans not attempted because the pass was abandoned
    pub skipped: usize,
    pub abandoned: bool,
}

/// Render every unprocessed math node of `document` in source order.
///
/// Failures never escape: a span that fails stays in its literal form,
/// and an error that poisons the renderer leaves every later span of the
/// pass literal too.
pub fn dispatch(document: &mut Document, renderer: &mut dyn MathRenderer) -> PassReport {
    let mut report = PassReport::default();
    let mut pending: Vec<_> = document
        .math_nodes_mut()
        .into_iter()
        .filter(|node| !node.processed)
        .collect();

    if pending.is_empty() {
        return report;
    }

    if let Err(err) = renderer.begin_pass() {
        tracing::warn!(%err, spans = pending.len(), "math rendering unavailable, leaving spans unrendered");
        report.skipped = pending.len();
        report.abandoned = true;
        return report;
    }
    tracing::debug!(spans = pending.len(), "math pass started");

    let engine_class = renderer.engine_class();
    let total = pending.len();

    for (index, node) in pending.iter_mut().enumerate() {
        match renderer.render(node.content(), node.mode()) {
            Ok(markup) => {
                node.rendered = Some(Typeset {
                    markup,
                    engine_class,
                });
                node.processed = true;
                report.rendered += 1;
            }
            Err(err) if err.abandons_pass() => {
                tracing::warn!(%err, remaining = total - index, "abandoning math pass");
                report.failed += 1;
                report.skipped = total - index - 1;
                report.abandoned = true;
                break;
            }
            Err(err) => {
                tracing::warn!(%err, source = ?node.span.source, "failed to render math span");
                report.failed += 1;
            }
        }
    }

    if let Err(err) = renderer.end_pass() {
        tracing::warn!(%err, "failed to finish math pass");
    }

    report
}
