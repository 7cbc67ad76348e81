use super::{rules_with_attributes, StyleRenderer};
use crate::stylesheet::node::{resolve_selector, StyleTree};

/// One block per rule, one attribute per line, blank line between blocks.
pub struct Expanded;

impl StyleRenderer for Expanded {
    fn name(&self) -> &str {
        "expanded"
    }

    fn description(&self) -> &str {
        "One attribute per line, blocks separated by blank lines"
    }

    fn render(&self, tree: &StyleTree) -> String {
        rules_with_attributes(tree)
            .map(|id| {
                let body: String = tree
                    .get(id)
                    .attributes()
                    .iter()
                    .map(|(name, value)| format!("  {name}: {value};\n"))
                    .collect();
                format!("{} {{\n{body}}}\n", resolve_selector(tree, id, ", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
