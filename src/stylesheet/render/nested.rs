use super::StyleRenderer;
use crate::stylesheet::node::{resolve_selector, StyleTree};
use crate::tree::NodeId;

/// Rules indented by nesting depth, closing brace on the last attribute line.
///
/// ```text
/// a b {
///   color: red;
///   margin: 0; }
///   a b i {
///     top: 0; }
/// ```
pub struct Nested;

impl StyleRenderer for Nested {
    fn name(&self) -> &str {
        "nested"
    }

    fn description(&self) -> &str {
        "Indented by nesting depth (default)"
    }

    fn render(&self, tree: &StyleTree) -> String {
        let mut out = String::new();
        render_level(tree, tree.roots(), 0, &mut out);
        out
    }
}

fn render_level(tree: &StyleTree, ids: &[NodeId], level: usize, out: &mut String) {
    for &id in ids {
        let node = tree.get(id);
        if !node.has_attributes() {
            render_level(tree, tree.children(id), level, out);
            continue;
        }
        let pad = "  ".repeat(level);
        let body: Vec<String> = node
            .attributes()
            .iter()
            .map(|(name, value)| format!("{pad}  {name}: {value};"))
            .collect();
        out.push_str(&format!(
            "{pad}{} {{\n{} }}\n",
            resolve_selector(tree, id, ", "),
            body.join("\n")
        ));
        render_level(tree, tree.children(id), level + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::node::StyleNode;
    use crate::tree::build_tree;

    #[test]
    fn test_children_indent_under_rendered_parents_only() {
        let mut a = StyleNode::new("a", 1);
        a.set_attribute("color", "red");
        let b = StyleNode::new("b", 2);
        let mut c = StyleNode::new("c", 3);
        c.set_attribute("top", "0");
        let tree = build_tree(vec![(0, a), (1, b), (2, c)]);
        assert_eq!(
            Nested.render(&tree),
            "a {\n  color: red; }\n  a b c {\n    top: 0; }\n"
        );
    }
}
