//! Configuration loader.
//!
//! `defaults/terrace.default.toml` is embedded into the crate so that docs and runtime
//! behavior stay in sync. Applications layer user files and single-key overrides on top of
//! those defaults via [`Loader`] before deserializing into [`TerraceConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::lexing::IndentUnit;

const DEFAULT_TOML: &str = include_str!("../defaults/terrace.default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerraceConfig {
    pub stylesheet: StylesheetConfig,
    pub markup: MarkupConfig,
}

/// Knobs of the stylesheet compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesheetConfig {
    pub style: String,
    pub indent: IndentUnit,
    pub cache: bool,
    pub cache_extension: String,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl StylesheetConfig {
    /// Where content-hash artifacts go; falls back to the system temp dir.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("terrace").join("css"))
    }
}

impl Default for StylesheetConfig {
    fn default() -> Self {
        StylesheetConfig {
            style: "nested".to_string(),
            indent: IndentUnit::Spaces(2),
            cache: false,
            cache_extension: "css".to_string(),
            cache_dir: None,
        }
    }
}

/// Knobs of the markup compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupConfig {
    pub indent: IndentUnit,
    pub extension: String,
    pub compiled_extension: String,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
    pub debug: bool,
    pub collapse_whitespace: bool,
    pub compress: bool,
    pub embed_code: bool,
    pub translate_function: String,
    pub max_passes: usize,
    pub wrap_width: usize,
    pub script_prefix: String,
    pub image_prefix: String,
}

impl MarkupConfig {
    /// Where compiled templates go; falls back to the system temp dir.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("terrace").join("markup"))
    }
}

impl Default for MarkupConfig {
    fn default() -> Self {
        MarkupConfig {
            indent: IndentUnit::Tab,
            extension: "haml".to_string(),
            compiled_extension: "tpl".to_string(),
            cache_dir: None,
            no_cache: false,
            debug: false,
            collapse_whitespace: false,
            compress: false,
            embed_code: true,
            translate_function: "translate".to_string(),
            max_passes: 32,
            wrap_width: 60,
            script_prefix: "/js/".to_string(),
            image_prefix: "/img/".to_string(),
        }
    }
}

/// Builds a [TerraceConfig] out of layers, later layers winning key by key.
///
/// The embedded defaults always come first, so a user file only lists the keys it
/// changes. The CLI stacks `./terrace.toml`, then `--config`, then its own flags.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file that must exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), true)
    }

    /// Layer a TOML file if it exists, e.g. a project's `terrace.toml`.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), false)
    }

    /// Override one key of the `[stylesheet]` section.
    pub fn stylesheet<I>(self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.set_key("stylesheet", key, value)
    }

    /// Override one key of the `[markup]` section, e.g. `debug` for `--debug`.
    pub fn markup<I>(self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.set_key("markup", key, value)
    }

    pub fn build(self) -> Result<TerraceConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }

    fn with_toml(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    fn set_key<I>(mut self, section: &str, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(format!("{section}.{key}"), value)?;
        Ok(self)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
