//! Text rendering of a composition for logs and diagnostics.

use std::fmt;

use termtree::Tree;

use crate::domain::arena::{Composition, NodeId};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for Composition {
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &Composition, id: NodeId) -> Option<Tree<String>> {
            let node = tree.get_node(id)?;
            let leaves: Vec<Tree<String>> = node
                .children
                .iter()
                .filter_map(|&child| build_tree(tree, child))
                .collect();
            Some(Tree::new(node.data.to_string()).with_leaves(leaves))
        }

        if self.is_empty() {
            return Tree::new("Empty composition".to_string());
        }
        let leaves: Vec<Tree<String>> = self
            .roots()
            .iter()
            .filter_map(|&root| build_tree(self, root))
            .collect();
        Tree::new("composition".to_string()).with_leaves(leaves)
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tree_string())
    }
}
