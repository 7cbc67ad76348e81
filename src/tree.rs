//! Indentation tree
//!
//!     Both compilers fold a flat list of (depth, payload) lines into a forest. Nodes live
//!     in a single arena ([Tree]) and refer to each other through [NodeId] indices, so
//!     parent and sibling queries are plain lookups and there are no reference cycles.
//!
//! Building
//!
//!     [TreeBuilder] keeps the path of currently open nodes, one per depth. A line at depth
//!     d closes everything at depth >= d and attaches to the open node at depth d - 1. A
//!     line that jumps more than one level deeper than its predecessor is attached to the
//!     deepest open node; its tree depth is then smaller than the depth it was written at.
//!
//!     Once built, the tree is read-only for the renderers, with one exception: text blocks
//!     detach their children ([Tree::clear_children]) after consuming them as raw source.

use std::sync::Arc;

/// Callback fired each time a compiler parses a source into a tree. Cache hits skip it.
pub type TreeBuiltHook = Arc<dyn Fn() + Send + Sync>;

/// Index of a node inside its [Tree].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    pub data: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

/// Arena-backed forest.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    roots: Vec<NodeId>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Tree {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Add a node under `parent`, or as a new root.
    pub fn append(&mut self, parent: Option<NodeId>, data: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = parent.map(|p| self.nodes[p.0].depth + 1).unwrap_or(0);
        self.nodes.push(Node {
            data,
            parent,
            children: Vec::new(),
            depth,
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].data
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn grandparent(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).and_then(|p| self.parent(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    /// Depth in the tree; roots are at 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// The node and its siblings, in source order. Roots are siblings of each other.
    pub fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.parent(id) {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    pub fn child_index(&self, id: NodeId) -> usize {
        self.siblings(id)
            .iter()
            .position(|s| *s == id)
            .unwrap_or_default()
    }

    pub fn is_first_child(&self, id: NodeId) -> bool {
        self.siblings(id).first() == Some(&id)
    }

    pub fn is_last_child(&self, id: NodeId) -> bool {
        self.siblings(id).last() == Some(&id)
    }

    /// The sibling right before `id`, if any.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.child_index(id);
        index
            .checked_sub(1)
            .and_then(|i| self.siblings(id).get(i).copied())
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Detach all children of `id`. The detached nodes stay in the arena but are no
    /// longer reachable from the roots.
    pub fn clear_children(&mut self, id: NodeId) {
        self.nodes[id.0].children.clear();
    }

    /// Pre-order walk over every reachable node.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

/// Incremental builder turning (depth, payload) pairs into a [Tree].
#[derive(Debug)]
pub struct TreeBuilder<T> {
    tree: Tree<T>,
    open: Vec<NodeId>,
}

impl<T> Default for TreeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeBuilder<T> {
    pub fn new() -> Self {
        TreeBuilder {
            tree: Tree::new(),
            open: Vec::new(),
        }
    }

    /// Attach a node written at `depth`, returning its id.
    pub fn push(&mut self, depth: usize, data: T) -> NodeId {
        let depth = depth.min(self.open.len());
        self.open.truncate(depth);
        let parent = self.open.last().copied();
        let id = self.tree.append(parent, data);
        self.open.push(id);
        id
    }

    /// The open node at `depth`: the most recent node at that depth whose subtree the
    /// builder is still inside.
    pub fn open_at(&self, depth: usize) -> Option<NodeId> {
        self.open.get(depth).copied()
    }

    pub fn tree_mut(&mut self) -> &mut Tree<T> {
        &mut self.tree
    }

    pub fn finish(self) -> Tree<T> {
        self.tree
    }
}

/// Build a tree from (depth, payload) pairs in one go.
pub fn build_tree<T>(lines: impl IntoIterator<Item = (usize, T)>) -> Tree<T> {
    let mut builder = TreeBuilder::new();
    for (depth, data) in lines {
        builder.push(depth, data);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree<&'static str> {
        build_tree(vec![
            (0, "html"),
            (1, "head"),
            (2, "title"),
            (1, "body"),
            (2, "p"),
            (2, "ul"),
            (0, "footer"),
        ])
    }

    #[test]
    fn test_parents_follow_indentation() {
        let tree = sample();
        let html = tree.roots()[0];
        let children: Vec<_> = tree.children(html).iter().map(|c| *tree.get(*c)).collect();
        assert_eq!(children, vec!["head", "body"]);
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn test_sibling_queries() {
        let tree = sample();
        let body = tree.children(tree.roots()[0])[1];
        let p = tree.children(body)[0];
        let ul = tree.children(body)[1];
        assert!(tree.is_first_child(p));
        assert!(!tree.is_last_child(p));
        assert!(tree.is_last_child(ul));
        assert_eq!(tree.child_index(ul), 1);
        assert_eq!(tree.previous_sibling(ul), Some(p));
        assert_eq!(tree.grandparent(p), Some(tree.roots()[0]));
        assert!(tree.is_last_child(tree.roots()[1]));
    }

    #[test]
    fn test_depth_jump_attaches_to_deepest_open_node() {
        let tree = build_tree(vec![(0, "a"), (3, "b"), (1, "c")]);
        let a = tree.roots()[0];
        let kids: Vec<_> = tree.children(a).iter().map(|c| *tree.get(*c)).collect();
        assert_eq!(kids, vec!["b", "c"]);
        assert_eq!(tree.depth(tree.children(a)[0]), 1);
    }

    #[test]
    fn test_clear_children_detaches_subtree() {
        let mut tree = sample();
        let html = tree.roots()[0];
        tree.clear_children(html);
        let names: Vec<_> = tree.preorder().iter().map(|n| *tree.get(*n)).collect();
        assert_eq!(names, vec!["html", "footer"]);
    }

    #[test]
    fn test_preorder_matches_source_order() {
        let tree = sample();
        let names: Vec<_> = tree.preorder().iter().map(|n| *tree.get(*n)).collect();
        assert_eq!(
            names,
            vec!["html", "head", "title", "body", "p", "ul", "footer"]
        );
    }
}
