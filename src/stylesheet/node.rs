use crate::tree::{NodeId, Tree};

/// A rule and the attributes attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNode {
    pub rule: String,
    pub line: usize,
    attributes: Vec<(String, String)>,
}

pub type StyleTree = Tree<StyleNode>;

impl StyleNode {
    pub fn new(rule: impl Into<String>, line: usize) -> Self {
        StyleNode {
            rule: rule.into(),
            line,
            attributes: Vec::new(),
        }
    }

    /// Set an attribute, replacing an earlier value of the same name in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(known, _)| *known == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}

/// Comma-separated selector fragments of a node, resolved against all its ancestors.
///
/// Every fragment of the node is prefixed with every resolved fragment of its parent,
/// so `a, b` nested under `ul, ol` yields four selectors.
pub fn selector_fragments(tree: &StyleTree, id: NodeId) -> Vec<String> {
    let own = tree
        .get(id)
        .rule
        .split(',')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty());
    match tree.parent(id) {
        None => own.map(str::to_string).collect(),
        Some(parent) => {
            let parents = selector_fragments(tree, parent);
            own.flat_map(|fragment| {
                parents
                    .iter()
                    .map(move |prefix| format!("{prefix} {fragment}"))
            })
            .collect()
        }
    }
}

/// The full selector of a node, fragments joined with `separator`.
pub fn resolve_selector(tree: &StyleTree, id: NodeId, separator: &str) -> String {
    selector_fragments(tree, id).join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;

    #[test]
    fn test_selector_cross_product() {
        let tree = build_tree(vec![
            (0, StyleNode::new("ul, ol", 1)),
            (1, StyleNode::new("li", 2)),
            (2, StyleNode::new("a, span", 3)),
        ]);
        let deepest = tree.preorder()[2];
        assert_eq!(
            resolve_selector(&tree, deepest, ", "),
            "ul li a, ol li a, ul li span, ol li span"
        );
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut node = StyleNode::new("a", 1);
        node.set_attribute("color", "red");
        node.set_attribute("margin", "0");
        node.set_attribute("color", "blue");
        assert_eq!(
            node.attributes(),
            &[
                ("color".to_string(), "blue".to_string()),
                ("margin".to_string(), "0".to_string())
            ]
        );
    }
}
