use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{Factor, Fragment, Group};
use crate::domain::error::{DomainError, DomainResult};

/// Stable node identity.
///
/// Wraps a generational index: once a node is removed its id never resolves again,
/// even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "{slot}v{generation}")
    }
}

/// Where a node sits: the top-level sequence or inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    Root,
    Group(NodeId),
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parent::Root => write!(f, "root"),
            Parent::Group(id) => write!(f, "{id}"),
        }
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Fragment(Fragment),
    Group(Group),
}

impl NodeData {
    pub fn enabled(&self) -> bool {
        match self {
            NodeData::Fragment(f) => f.enabled,
            NodeData::Group(g) => g.enabled,
        }
    }

    pub fn factor(&self) -> Option<Factor> {
        match self {
            NodeData::Fragment(f) => f.factor,
            NodeData::Group(g) => g.factor,
        }
    }

    pub fn negative(&self) -> bool {
        match self {
            NodeData::Fragment(f) => f.negative,
            NodeData::Group(g) => g.negative,
        }
    }

    pub(crate) fn enabled_mut(&mut self) -> &mut bool {
        match self {
            NodeData::Fragment(f) => &mut f.enabled,
            NodeData::Group(g) => &mut g.enabled,
        }
    }

    pub(crate) fn factor_mut(&mut self) -> &mut Option<Factor> {
        match self {
            NodeData::Fragment(f) => &mut f.factor,
            NodeData::Group(g) => &mut g.factor,
        }
    }

    pub(crate) fn negative_mut(&mut self) -> &mut bool {
        match self {
            NodeData::Fragment(f) => &mut f.negative,
            NodeData::Group(g) => &mut g.negative,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, NodeData::Group(_))
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mark, label, factor) = match self {
            NodeData::Fragment(frag) => (
                if frag.enabled { "[x]" } else { "[ ]" },
                frag.signed_text(),
                frag.factor,
            ),
            NodeData::Group(group) => (
                if group.enabled { "[x]" } else { "[ ]" },
                format!("{}/", group.signed_name()),
                group.factor,
            ),
        };
        match factor {
            Some(factor) => write!(f, "{mark} {label}:{factor}"),
            None => write!(f, "{mark} {label}"),
        }
    }
}

/// Tree node in the arena-based composition.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub data: NodeData,
    /// Owning group, None for top-level nodes
    pub parent: Option<NodeId>,
    /// Ordered children; always empty for fragments
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn parent_ref(&self) -> Parent {
        self.parent.map_or(Parent::Root, Parent::Group)
    }
}

/// Arena-backed prompt composition tree.
///
/// The composition is the sole owner of every node. Groups hold ordered child ids;
/// the top level is a mixed sequence of fragments and groups.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    nodes: Arena<TreeNode>,
    roots: Vec<NodeId>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent` at `index` (clamped to the sequence length).
    #[instrument(level = "trace", skip(self, data))]
    pub(crate) fn insert_node(
        &mut self,
        data: NodeData,
        parent: Parent,
        index: usize,
    ) -> DomainResult<NodeId> {
        // validate before touching the arena
        self.children(parent)?;
        let id = NodeId(self.nodes.insert(TreeNode {
            data,
            parent: match parent {
                Parent::Root => None,
                Parent::Group(g) => Some(g),
            },
            children: Vec::new(),
        }));
        let siblings = self.children_mut(parent)?;
        let at = index.min(siblings.len());
        siblings.insert(at, id);
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0)
    }

    pub(crate) fn node(&self, id: NodeId) -> DomainResult<&TreeNode> {
        self.get_node(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut TreeNode> {
        self.get_node_mut(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Ordered children of `parent`; fails for unknown ids and fragments.
    pub fn children(&self, parent: Parent) -> DomainResult<&[NodeId]> {
        match parent {
            Parent::Root => Ok(&self.roots),
            Parent::Group(id) => {
                let node = self.node(id)?;
                if node.data.is_group() {
                    Ok(&node.children)
                } else {
                    Err(DomainError::NotAGroup(id))
                }
            }
        }
    }

    pub(crate) fn children_mut(&mut self, parent: Parent) -> DomainResult<&mut Vec<NodeId>> {
        match parent {
            Parent::Root => Ok(&mut self.roots),
            Parent::Group(id) => {
                let node = self.node_mut(id)?;
                if node.data.is_group() {
                    Ok(&mut node.children)
                } else {
                    Err(DomainError::NotAGroup(id))
                }
            }
        }
    }

    /// Detach `id` from its parent's sequence, returning the old position.
    /// The node and its subtree stay in the arena.
    pub(crate) fn detach(&mut self, id: NodeId) -> DomainResult<(Parent, usize)> {
        let parent = self.node(id)?.parent_ref();
        let siblings = self.children_mut(parent)?;
        let index = siblings
            .iter()
            .position(|&c| c == id)
            .ok_or(DomainError::NodeNotFound(id))?;
        siblings.remove(index);
        Ok((parent, index))
    }

    /// Attach a detached node under `parent` at `index` (clamped).
    pub(crate) fn attach(&mut self, id: NodeId, parent: Parent, index: usize) -> DomainResult<usize> {
        let siblings = self.children_mut(parent)?;
        let at = index.min(siblings.len());
        siblings.insert(at, id);
        self.node_mut(id)?.parent = match parent {
            Parent::Root => None,
            Parent::Group(g) => Some(g),
        };
        Ok(at)
    }

    /// Drop a detached subtree from the arena, children before parents.
    pub(crate) fn free_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let doomed: Vec<NodeId> = self.iter_postorder_from(id).map(|(i, _)| i).collect();
        for &node in &doomed {
            self.nodes.remove(node.0);
        }
        doomed
    }

    /// Free every node one by one; each removal bumps the arena generation.
    pub(crate) fn clear_all(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.free_subtree(root);
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, left-to-right traversal of the whole tree.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.roots.clone())
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn iter_from(&self, id: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, vec![id])
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.roots.clone())
    }

    pub fn iter_postorder_from(&self, id: NodeId) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, vec![id])
    }

    /// Longest root-to-leaf path, counted in nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        if let Some(node) = self.get_node(id) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// True if `ancestor` is `id` itself or encloses it.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get_node(node).and_then(|n| n.parent);
        }
        false
    }
}

pub struct TreeIterator<'a> {
    tree: &'a Composition,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a Composition, mut starts: Vec<NodeId>) -> Self {
        // reversed so the first start is popped first
        starts.reverse();
        Self {
            tree,
            stack: starts,
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a Composition,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a Composition, starts: Vec<NodeId>) -> Self {
        let stack = starts.into_iter().rev().map(|id| (id, false)).collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current, node));
                }
            }
        }
        None
    }
}
