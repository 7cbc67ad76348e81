use std::path::PathBuf;

use super::line_classification::{classify_line, MarkupLine};
use super::normalization::NormalizedLine;
use crate::lexing::IndentUnit;
use crate::tree::{NodeId, Tree, TreeBuilder};

/// One non-blank line of normalized markup, placed in the tree by its indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupNode {
    /// 1-based line number in the normalized source
    pub line: usize,
    /// Line text without indentation
    pub content: String,
    /// Include file the line came from
    pub origin: Option<PathBuf>,
}

impl MarkupNode {
    pub fn kind(&self) -> MarkupLine<'_> {
        classify_line(&self.content)
    }
}

pub type MarkupTree = Tree<MarkupNode>;

/// Build the markup tree from normalized lines.
///
/// Blank lines are skipped. Text blocks keep no children (their nested lines are raw
/// input for the block), and neither do internal comments or dynamic includes.
pub fn build_markup_tree(lines: &[NormalizedLine], unit: IndentUnit) -> MarkupTree {
    let mut builder = TreeBuilder::new();
    for (idx, line) in lines.iter().enumerate() {
        let content = line.text.trim();
        if content.is_empty() {
            continue;
        }
        builder.push(
            unit.depth_of(&line.text),
            MarkupNode {
                line: idx + 1,
                content: content.to_string(),
                origin: line.origin.clone(),
            },
        );
    }

    let mut tree = builder.finish();
    let detached: Vec<NodeId> = tree
        .preorder()
        .into_iter()
        .filter(|&id| {
            matches!(
                tree.get(id).kind(),
                MarkupLine::TextBlock(_) | MarkupLine::InternalComment | MarkupLine::DynamicInclude(_)
            )
        })
        .collect();
    for id in detached {
        tree.clear_children(id);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(source: &str) -> Vec<NormalizedLine> {
        source
            .split('\n')
            .map(|text| NormalizedLine {
                text: text.to_string(),
                origin: None,
            })
            .collect()
    }

    #[test]
    fn test_tree_follows_indentation() {
        let tree = build_markup_tree(&lines("%ul\n\t%li a\n\n\t%li b\n%p"), IndentUnit::Tab);
        let roots = tree.roots().to_vec();
        assert_eq!(roots.len(), 2);
        let items = tree.children(roots[0]);
        assert_eq!(items.len(), 2);
        assert_eq!(tree.get(items[1]).line, 4);
        assert_eq!(tree.get(items[1]).content, "%li b");
    }

    #[test]
    fn test_text_blocks_and_comments_drop_children() {
        let tree = build_markup_tree(
            &lines(":markdown\n\t# Title\n// note\n\t%p hidden\n%p"),
            IndentUnit::Tab,
        );
        let roots = tree.roots().to_vec();
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().all(|&id| !tree.has_children(id)));
    }
}
