//! Error types for the markdown-math library.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A delimiter pair that cannot form a math span.
///
/// Never shown to readers: the text it covers is left as literal text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedSpan {
    #[error("opening and closing delimiters have different run lengths")]
    RunMismatch,

    #[error("closing delimiter precedes opening delimiter")]
    Inverted,

    #[error("unescaped delimiter inside span at byte {position}")]
    NestedDelimiter { position: usize },
}

/// Errors that occur while dispatching spans to a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to start rendering worker `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rendering worker pipe failed: {0}")]
    WorkerIo(#[from] std::io::Error),

    #[error("Rendering worker exited before replying")]
    WorkerExited,

    #[error("Malformed reply from rendering worker: {0}")]
    MalformedReply(String),

    #[error("Rendering worker did not reply within {0:?}")]
    Timeout(Duration),

    #[error("Asset load error: {0}")]
    AssetLoad(#[from] AssetLoadError),

    #[error("Typesetting error: {0}")]
    Typeset(String),
}

impl RenderError {
    /// Whether the remaining spans of the current pass must be skipped.
    ///
    /// Worker failures poison the pipe, so nothing after them can be
    /// trusted. Typesetting failures only affect the span that raised them.
    pub fn abandons_pass(&self) -> bool {
        !matches!(self, Self::Typeset(_))
    }
}

/// A client asset could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {url}: {reason}")]
pub struct AssetLoadError {
    pub url: String,
    pub reason: String,
}

/// Errors that occur while reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
