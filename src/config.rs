//! Settings that decide whether math is processed and how it is rendered.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client-side typesetting library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    MathJax,
    KaTeX,
}

impl Provider {
    /// Class added to rendered containers so stylesheets can target them.
    pub fn engine_class(self) -> &'static str {
        match self {
            Self::MathJax => "mathjax-math",
            Self::KaTeX => "katex-math",
        }
    }
}

/// Where spans are typeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingMode {
    /// In the viewer, by the provider's library
    #[default]
    Client,
    /// Before display, by an external worker process
    Server,
}

/// Places where user-authored markup is cooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Post,
    Chat,
}

/// Per-context toggles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Contexts {
    pub posts: bool,
    pub chat: bool,
}

impl Default for Contexts {
    fn default() -> Self {
        Self {
            posts: true,
            chat: false,
        }
    }
}

/// How to start the server-side rendering worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Directory the worker is started in
    pub working_dir: Option<PathBuf>,
    /// How long to wait for each reply
    pub timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["render.js".to_string()],
            working_dir: None,
            timeout_ms: 10_000,
        }
    }
}

impl WorkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Math settings for an installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MathSettings {
    pub enabled: bool,
    pub provider: Provider,
    pub rendering: RenderingMode,
    /// Load the chemistry notation extension after the library
    pub enable_mhchem: bool,
    /// URL prefix the client assets are served under
    pub asset_base: String,
    pub contexts: Contexts,
    pub worker: WorkerConfig,
}

impl Default for MathSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: Provider::default(),
            rendering: RenderingMode::default(),
            enable_mhchem: true,
            asset_base: "/assets/math".to_string(),
            contexts: Contexts::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl MathSettings {
    /// Parse settings from TOML. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&input)?)
    }

    /// Whether math should be processed for markup cooked in `context`.
    pub fn applies_to(&self, context: Context) -> bool {
        self.enabled
            && match context {
                Context::Post => self.contexts.posts,
                Context::Chat => self.contexts.chat,
            }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rendering == RenderingMode::Server {
            if self.worker.command.trim().is_empty() {
                return Err(ConfigError::Invalid("worker.command is empty".into()));
            }
            if self.worker.timeout_ms == 0 {
                return Err(ConfigError::Invalid("worker.timeout_ms must be positive".into()));
            }
        }
        Ok(())
    }
}
