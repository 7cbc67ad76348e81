use super::{rules_with_attributes, StyleRenderer};
use crate::stylesheet::node::{resolve_selector, StyleTree};

/// Everything on one line, no optional whitespace or trailing semicolons.
pub struct Compressed;

impl StyleRenderer for Compressed {
    fn name(&self) -> &str {
        "compressed"
    }

    fn description(&self) -> &str {
        "Minified, single line"
    }

    fn render(&self, tree: &StyleTree) -> String {
        rules_with_attributes(tree)
            .map(|id| {
                let body: Vec<String> = tree
                    .get(id)
                    .attributes()
                    .iter()
                    .map(|(name, value)| format!("{name}:{value}"))
                    .collect();
                format!("{}{{{}}}", resolve_selector(tree, id, ","), body.join(";"))
            })
            .collect()
    }
}
