//! Client-side rendering: spans are typeset in the viewer by the provider's
//! library, which is loaded once per session.

use super::MathRenderer;
use crate::ast::MathMode;
use crate::config::{MathSettings, Provider};
use crate::error::{AssetLoadError, RenderError};
use crate::render::escape_html;
use std::collections::BTreeMap;

/// User-defined macros shared by the spans of one pass.
pub type Macros = BTreeMap<String, String>;

/// Kind of client asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Stylesheet,
}

/// A file the typesetting library needs in the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub kind: AssetKind,
    pub url: String,
}

impl Asset {
    fn script(url: String) -> Self {
        Self {
            kind: AssetKind::Script,
            url,
        }
    }

    fn stylesheet(url: String) -> Self {
        Self {
            kind: AssetKind::Stylesheet,
            url,
        }
    }

    /// The tag that loads this asset.
    pub fn tag(&self) -> String {
        match self.kind {
            AssetKind::Script => format!(r#"<script src="{}"></script>"#, self.url),
            AssetKind::Stylesheet => format!(r#"<link rel="stylesheet" href="{}">"#, self.url),
        }
    }
}

/// Assets for `provider`, in load order.
///
/// The library comes first; the chemistry extension registers itself with
/// the library and cannot load before it.
pub fn provider_assets(provider: Provider, base: &str, mhchem: bool) -> Vec<Asset> {
    let base = base.trim_end_matches('/');
    let mut assets = match provider {
        Provider::KaTeX => vec![
            Asset::script(format!("{base}/katex/katex.min.js")),
            Asset::stylesheet(format!("{base}/katex/katex.min.css")),
        ],
        Provider::MathJax => vec![Asset::script(format!(
            "{base}/mathjax/MathJax.js?config=TeX-AMS_HTML"
        ))],
    };

    if mhchem {
        let extension = match provider {
            Provider::KaTeX => format!("{base}/katex/mhchem.min.js"),
            Provider::MathJax => format!("{base}/mathjax/mhchem.js"),
        };
        assets.push(Asset::script(extension));
    }

    assets
}

/// Fetches client assets.
pub trait AssetLoader {
    fn load(&mut self, asset: &Asset) -> Result<(), AssetLoadError>;

    /// Markup the page head needs for the loaded assets.
    fn head_content(&self) -> Option<String> {
        None
    }
}

/// Loader that emits head tags for the viewer to fetch.
#[derive(Debug, Clone, Default)]
pub struct HeadAssets {
    tags: Vec<String>,
}

impl AssetLoader for HeadAssets {
    fn load(&mut self, asset: &Asset) -> Result<(), AssetLoadError> {
        let tag = asset.tag();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        Ok(())
    }

    fn head_content(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.join("\n"))
        }
    }
}

/// Options for one typesetting call.
pub struct TypesetOptions<'a> {
    pub display_mode: bool,
    /// Macros of the current pass; definitions made by this span are added
    pub macros: &'a mut Macros,
}

/// The typesetting library as seen from one span.
pub trait Typesetter {
    fn typeset(&self, tex: &str, options: TypesetOptions<'_>) -> Result<String, RenderError>;
}

/// Typesetter that leaves the TeX for the in-browser library.
///
/// The output is the escaped source; global macro definitions are
/// recorded so later spans of the pass can use them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientMarkup;

impl Typesetter for ClientMarkup {
    fn typeset(&self, tex: &str, options: TypesetOptions<'_>) -> Result<String, RenderError> {
        for (name, body) in global_definitions(tex) {
            options.macros.insert(name, body);
        }
        Ok(escape_html(tex))
    }
}

/// Find `\gdef\name{body}` and `\global\def\name{body}` definitions.
fn global_definitions(tex: &str) -> Vec<(String, String)> {
    const PREFIXES: [&str; 2] = ["\\gdef", "\\global\\def"];

    let mut found = Vec::new();
    let mut rest = tex;

    while let Some((start, prefix)) = PREFIXES
        .iter()
        .filter_map(|p| rest.find(*p).map(|i| (i, *p)))
        .min_by_key(|(i, _)| *i)
    {
        let after = &rest[start + prefix.len()..];
        rest = after;

        let Some(name_part) = after.strip_prefix('\\') else {
            continue;
        };
        let name_len = name_part
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(name_part.len());
        if name_len == 0 {
            continue;
        }
        let name = &after[..name_len + 1];

        if let Some((body, remaining)) = braced(&name_part[name_len..]) {
            found.push((name.to_string(), body.to_string()));
            rest = remaining;
        }
    }

    found
}

/// Split `{body}rest` at the brace matching the first one.
fn braced(input: &str) -> Option<(&str, &str)> {
    let input = input.strip_prefix('{')?;
    let mut depth = 1;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&input[..i], &input[i + 1..]));
                }
            }
            _ => {}
        }
    }

    None
}

/// Renderer for client-side typesetting.
pub struct ClientRenderer<T = ClientMarkup, L = HeadAssets> {
    provider: Provider,
    assets: Vec<Asset>,
    typesetter: T,
    loader: L,
    /// Set once every asset loaded; never cleared for the renderer's life.
    library_loaded: bool,
    macros: Macros,
}

impl ClientRenderer {
    /// Create a renderer with the built-in typesetter and loader.
    pub fn new(settings: &MathSettings) -> Self {
        Self::with_parts(settings, ClientMarkup, HeadAssets::default())
    }
}

impl<T, L> ClientRenderer<T, L> {
    pub fn with_parts(settings: &MathSettings, typesetter: T, loader: L) -> Self {
        Self {
            provider: settings.provider,
            assets: provider_assets(settings.provider, &settings.asset_base, settings.enable_mhchem),
            typesetter,
            loader,
            library_loaded: false,
            macros: Macros::new(),
        }
    }

    pub fn library_loaded(&self) -> bool {
        self.library_loaded
    }

    /// Macros defined so far in the current (or last) pass.
    pub fn macros(&self) -> &Macros {
        &self.macros
    }

    /// The macros as a JSON object, for handing to the in-browser library.
    pub fn macros_json(&self) -> String {
        serde_json::to_string(&self.macros).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<T, L: AssetLoader> ClientRenderer<T, L> {
    fn ensure_library(&mut self) -> Result<(), AssetLoadError> {
        if self.library_loaded {
            return Ok(());
        }

        for asset in &self.assets {
            self.loader.load(asset)?;
        }
        tracing::debug!(provider = ?self.provider, assets = self.assets.len(), "math library loaded");
        self.library_loaded = true;
        Ok(())
    }
}

impl<T: Typesetter, L: AssetLoader> MathRenderer for ClientRenderer<T, L> {
    fn engine_class(&self) -> &'static str {
        self.provider.engine_class()
    }

    fn begin_pass(&mut self) -> Result<(), RenderError> {
        self.ensure_library()?;
        self.macros = Macros::new();
        Ok(())
    }

    fn render(&mut self, content: &str, mode: MathMode) -> Result<String, RenderError> {
        self.typesetter.typeset(
            content,
            TypesetOptions {
                display_mode: mode.is_display(),
                macros: &mut self.macros,
            },
        )
    }

    fn head_content(&self) -> Option<String> {
        self.loader.head_content()
    }
}
