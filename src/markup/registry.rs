//! Text block and output filter registries
//!
//! Text blocks (`:name` lines) hand their children's raw source to a named transform and
//! splice the result into the output. Output filters post-process every compiled template
//! before it is cached. Both registries belong to an engine instance; cloning an engine
//! clones its registries, so two engines never see each other's registrations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::StylesheetConfig;
use crate::stylesheet::StylesheetCompiler;

/// Transform behind a `:name` text block.
pub type TextBlockFn = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Post-processing step applied to compiled template code.
pub type OutputFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct TextBlockRegistry {
    blocks: HashMap<String, TextBlockFn>,
}

impl TextBlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a text block, replacing any block of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.blocks.insert(name.into(), Arc::new(transform));
    }

    /// Remove a text block, reporting whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.blocks.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&TextBlockFn> {
        self.blocks.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.blocks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registry with the built-in `markdown` and `sass` blocks.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("markdown", |text| {
            Ok(comrak::markdown_to_html(text, &comrak::Options::default()))
        });
        registry.register("sass", |text| {
            StylesheetCompiler::new(StylesheetConfig::default())
                .compile(text, &[])
                .map_err(|err| err.to_string())
        });
        registry
    }
}

impl fmt::Debug for TextBlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBlockRegistry")
            .field("blocks", &self.names())
            .finish()
    }
}

/// Ordered list of output filters; registering an existing name replaces it in place.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<(String, OutputFilter)>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        let filter: OutputFilter = Arc::new(filter);
        match self.filters.iter_mut().find(|(known, _)| *known == name) {
            Some(slot) => slot.1 = filter,
            None => self.filters.push((name, filter)),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(known, _)| known != name);
        self.filters.len() != before
    }

    /// Run every filter in registration order.
    pub fn apply(&self, code: &str) -> String {
        self.filters
            .iter()
            .fold(code.to_string(), |acc, (_, filter)| filter(&acc))
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocks() {
        let registry = TextBlockRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["markdown", "sass"]);
        let html = (registry.get("markdown").unwrap())("# Title").unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        let css = (registry.get("sass").unwrap())("a\n  :color red").unwrap();
        assert_eq!(css, "a {\n  color: red; }");
    }

    #[test]
    fn test_register_and_unregister_block() {
        let mut registry = TextBlockRegistry::new();
        registry.register("upper", |text| Ok(text.to_uppercase()));
        assert!(registry.has("upper"));
        assert!(registry.unregister("upper"));
        assert!(!registry.unregister("upper"));
    }

    #[test]
    fn test_filters_run_in_order_and_replace_in_place() {
        let mut filters = FilterRegistry::new();
        filters.register("a", |s| format!("{s}a"));
        filters.register("b", |s| format!("{s}b"));
        filters.register("a", |s| format!("{s}A"));
        assert_eq!(filters.apply("x"), "xAb");
        assert!(filters.unregister("b"));
        assert_eq!(filters.names(), vec!["a"]);
    }
}
