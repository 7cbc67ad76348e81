use super::{rules_with_attributes, StyleRenderer};
use crate::stylesheet::node::{resolve_selector, StyleTree};

/// One line per rule: `a{color:red;margin:0;}`.
pub struct Compact;

impl StyleRenderer for Compact {
    fn name(&self) -> &str {
        "compact"
    }

    fn description(&self) -> &str {
        "One rule per line"
    }

    fn render(&self, tree: &StyleTree) -> String {
        rules_with_attributes(tree)
            .map(|id| {
                let body: String = tree
                    .get(id)
                    .attributes()
                    .iter()
                    .map(|(name, value)| format!("{name}:{value};"))
                    .collect();
                format!("{}{{{body}}}\n", resolve_selector(tree, id, ", "))
            })
            .collect()
    }
}
