//! Property-based tests for the indentation tree and the calculator

use proptest::prelude::*;
use terrace::calculator::Calculator;
use terrace::tree::build_tree;

proptest! {
    /// Every line ends up in the tree exactly once, in source order.
    #[test]
    fn preorder_preserves_source_order(depths in prop::collection::vec(0usize..6, 0..40)) {
        let tree = build_tree(depths.iter().copied().enumerate().map(|(idx, depth)| (depth, idx)));
        let order: Vec<usize> = tree.preorder().into_iter().map(|id| *tree.get(id)).collect();
        let expected: Vec<usize> = (0..depths.len()).collect();
        prop_assert_eq!(order, expected);
    }

    /// A node is never deeper than written and at most one level below its predecessor.
    #[test]
    fn tree_depth_is_clamped(depths in prop::collection::vec(0usize..6, 1..40)) {
        let tree = build_tree(depths.iter().copied().enumerate().map(|(idx, depth)| (depth, idx)));
        let ids = tree.preorder();
        prop_assert_eq!(tree.depth(ids[0]), 0);
        for pair in ids.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            prop_assert!(tree.depth(current) <= tree.depth(previous) + 1);
            prop_assert!(tree.depth(current) <= depths[*tree.get(current)]);
        }
    }

    /// Parents always come before their children.
    #[test]
    fn parents_precede_children(depths in prop::collection::vec(0usize..6, 0..40)) {
        let tree = build_tree(depths.iter().copied().enumerate().map(|(idx, depth)| (depth, idx)));
        for id in tree.preorder() {
            if let Some(parent) = tree.parent(id) {
                prop_assert!(tree.get(parent) < tree.get(id));
                prop_assert_eq!(tree.depth(parent) + 1, tree.depth(id));
            }
        }
    }

    /// Integer arithmetic on plain numbers matches Rust's.
    #[test]
    fn calculator_adds_and_multiplies_integers(a in 0i64..1000, b in 0i64..1000, c in 1i64..50) {
        let calculator = Calculator::new();
        let expected = a + b * c;
        prop_assert_eq!(
            calculator.calculate(&format!("{a} + {b} * {c}")).unwrap(),
            expected.to_string()
        );
    }

    /// Lengths keep their unit through addition.
    #[test]
    fn calculator_keeps_units(a in 0u32..500, b in 0u32..500) {
        let calculator = Calculator::new();
        prop_assert_eq!(
            calculator.calculate(&format!("{a}px + {b}px")).unwrap(),
            format!("{}px", a + b)
        );
    }
}
