//! Output styles
//!
//! Each CSS output style implements [StyleRenderer] and is looked up by name in a
//! [RendererRegistry]. All styles share two rules: rules without attributes print nothing
//! (their children still do), and selectors are fully resolved against their ancestors.

mod compact;
mod compressed;
mod expanded;
mod nested;

use std::collections::HashMap;

pub use compact::Compact;
pub use compressed::Compressed;
pub use expanded::Expanded;
pub use nested::Nested;

use super::node::StyleTree;
use super::StylesheetError;
use crate::tree::NodeId;

/// A CSS output style.
pub trait StyleRenderer: Send + Sync {
    /// The name the style is selected by (e.g. "nested")
    fn name(&self) -> &str;

    fn render(&self, tree: &StyleTree) -> String;

    fn description(&self) -> &str {
        ""
    }
}

/// Nodes that carry attributes, in source order.
pub(crate) fn rules_with_attributes(tree: &StyleTree) -> impl Iterator<Item = NodeId> + '_ {
    tree.preorder()
        .into_iter()
        .filter(move |id| tree.get(*id).has_attributes())
}

/// Registry of output styles, keyed by name.
pub struct RendererRegistry {
    renderers: HashMap<String, Box<dyn StyleRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        RendererRegistry {
            renderers: HashMap::new(),
        }
    }

    /// Register a renderer, replacing any renderer of the same name.
    pub fn register<R: StyleRenderer + 'static>(&mut self, renderer: R) {
        self.renderers
            .insert(renderer.name().to_string(), Box::new(renderer));
    }

    pub fn get(&self, name: &str) -> Option<&dyn StyleRenderer> {
        self.renderers.get(name).map(|r| r.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    pub fn render(&self, tree: &StyleTree, style: &str) -> Result<String, StylesheetError> {
        let renderer = self
            .get(style)
            .ok_or_else(|| StylesheetError::UnknownStyle {
                name: style.to_string(),
            })?;
        Ok(renderer.render(tree))
    }

    /// Style names, sorted.
    pub fn list_styles(&self) -> Vec<String> {
        let mut names: Vec<_> = self.renderers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Nested);
        registry.register(Expanded);
        registry.register(Compact);
        registry.register(Compressed);
        registry
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
