//! Stylesheet compiler
//!
//!     Compiles an indentation-based stylesheet language into CSS:
//!
//!         !accent = #336699
//!         ul, ol
//!           :margin 0
//!           li
//!             :font
//!               :size 1.2em
//!             :color = !accent + #111
//!
//!     becomes, in the default nested style,
//!
//!         ul, ol {
//!           margin: 0; }
//!           ul li, ol li {
//!             font-size: 1.2em;
//!             color: rgb(68, 119, 170); }
//!
//! Pipeline
//!
//!     source -> lines (lexing) -> classified lines (line_classification)
//!            -> rule tree with attached attributes (builder) -> CSS (render)
//!
//!     Computed attributes are evaluated while the tree is built, so a constant must be
//!     defined above its first use.
//!
//! Caching
//!
//!     When enabled, results are stored in a [ContentHashCache] keyed by the source text
//!     together with the output style and the caller's constants. Recompiling the same
//!     input under the same settings returns the stored CSS without parsing.

pub mod builder;
pub mod line_classification;
pub mod node;
pub mod render;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use builder::StyleTreeBuilder;
pub use node::{StyleNode, StyleTree};
pub use render::{RendererRegistry, StyleRenderer};

use crate::cache::{ArtifactCache, CacheError, ContentHashCache};
use crate::calculator::{Calculator, CalculatorError};
use crate::config::StylesheetConfig;
use crate::tree::TreeBuiltHook;

#[derive(Debug, Error)]
pub enum StylesheetError {
    #[error("stylesheet not found: {path}")]
    SourceNotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown output style '{name}'")]
    UnknownStyle { name: String },
    #[error("line {line}: {source}")]
    Calculation {
        line: usize,
        #[source]
        source: CalculatorError,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Compiles stylesheet sources to CSS in a configured output style.
pub struct StylesheetCompiler {
    config: StylesheetConfig,
    renderers: RendererRegistry,
    cache: Option<ContentHashCache>,
    on_tree_built: Option<TreeBuiltHook>,
}

impl StylesheetCompiler {
    pub fn new(config: StylesheetConfig) -> Self {
        let cache = config
            .cache
            .then(|| ContentHashCache::new(config.cache_root(), config.cache_extension.clone()));
        StylesheetCompiler {
            config,
            renderers: RendererRegistry::with_defaults(),
            cache,
            on_tree_built: None,
        }
    }

    /// Enable the content-hash cache in `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache = Some(ContentHashCache::new(
            dir.clone(),
            self.config.cache_extension.clone(),
        ));
        self.config.cache = true;
        self.config.cache_dir = Some(dir);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self.config.cache = false;
        self
    }

    /// Call `hook` every time a source is actually parsed (i.e. on cache misses).
    pub fn on_tree_built(mut self, hook: TreeBuiltHook) -> Self {
        self.on_tree_built = Some(hook);
        self
    }

    pub fn style(&self) -> &str {
        &self.config.style
    }

    pub fn set_style(&mut self, style: impl Into<String>) -> Result<(), StylesheetError> {
        let style = style.into();
        if !self.renderers.has(&style) {
            return Err(StylesheetError::UnknownStyle { name: style });
        }
        self.config.style = style;
        Ok(())
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    /// Parse a source into its rule tree, evaluating computed attributes.
    pub fn parse(
        &self,
        source: &str,
        constants: &[(&str, &str)],
    ) -> Result<StyleTree, StylesheetError> {
        let mut calculator = Calculator::with_constants(constants.iter().copied());
        let tree = StyleTreeBuilder::new(&mut calculator).build(source, self.config.indent)?;
        if let Some(hook) = &self.on_tree_built {
            hook();
        }
        Ok(tree)
    }

    /// Render an already built tree in the named style.
    pub fn render_tree(&self, tree: &StyleTree, style: &str) -> Result<String, StylesheetError> {
        Ok(self.renderers.render(tree, style)?.trim_end().to_string())
    }

    /// Compile a source in the configured style, consulting the cache when enabled.
    pub fn compile(
        &self,
        source: &str,
        constants: &[(&str, &str)],
    ) -> Result<String, StylesheetError> {
        let style = self.config.style.as_str();
        if !self.renderers.has(style) {
            return Err(StylesheetError::UnknownStyle {
                name: style.to_string(),
            });
        }

        let key = self.cache.as_ref().map(|_| cache_key(source, style, constants));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(css) = cache.lookup(key)? {
                return Ok(css);
            }
        }

        let tree = self.parse(source, constants)?;
        let css = self.render_tree(&tree, style)?;
        debug!(style, rules = tree.len(), "stylesheet compiled");

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.store(key, &css)?;
        }
        Ok(css)
    }

    pub fn compile_file(
        &self,
        path: impl AsRef<Path>,
        constants: &[(&str, &str)],
    ) -> Result<String, StylesheetError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StylesheetError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let source = std::fs::read_to_string(path).map_err(|source| StylesheetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.compile(&source, constants)
    }
}

impl Default for StylesheetCompiler {
    fn default() -> Self {
        Self::new(StylesheetConfig::default())
    }
}

fn cache_key(source: &str, style: &str, constants: &[(&str, &str)]) -> String {
    let mut material = format!("{style}\0");
    for (name, value) in constants {
        material.push_str(&format!("{name}={value}\0"));
    }
    material.push_str(source);
    ContentHashCache::key_for(&material)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(style: &str) -> StylesheetCompiler {
        let mut compiler = StylesheetCompiler::default();
        compiler.set_style(style).unwrap();
        compiler
    }

    #[test]
    fn test_nested_rule_resolution() {
        let css = compiler("nested").compile("a\n  b\n    :color red", &[]).unwrap();
        assert_eq!(css, "a b {\n  color: red; }");
    }

    #[test]
    fn test_compact_computed_color() {
        let css = compiler("compact")
            .compile("a\n  :color = red", &[])
            .unwrap();
        assert_eq!(css, "a{color:rgb(255, 0, 0);}");
    }

    #[test]
    fn test_constants_from_caller() {
        let css = compiler("compact")
            .compile("p\n  :width = !w * 2", &[("w", "10px")])
            .unwrap();
        assert_eq!(css, "p{width:20px;}");
    }

    #[test]
    fn test_set_style_rejects_unknown_names() {
        let mut compiler = StylesheetCompiler::default();
        assert!(matches!(
            compiler.set_style("fancy"),
            Err(StylesheetError::UnknownStyle { .. })
        ));
        assert_eq!(compiler.style(), "nested");
    }

    #[test]
    fn test_cache_key_depends_on_style() {
        assert_ne!(cache_key("a", "nested", &[]), cache_key("a", "compact", &[]));
        assert_eq!(cache_key("a", "nested", &[]), cache_key("a", "nested", &[]));
    }
}
