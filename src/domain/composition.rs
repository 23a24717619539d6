//! Mutation API of the composition tree.
//!
//! Every operation validates first and writes second, so an `Err` leaves the tree
//! exactly as it was.

use tracing::{debug, instrument};

use crate::domain::arena::{Composition, NodeData, NodeId, Parent, TreeNode};
use crate::domain::entities::{normalize_name, split_sign, Factor, Fragment, Group};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::reorder::{self, Placement};

impl Composition {
    /// Insert a fragment from its signed text; returns the new id.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_fragment(&mut self, parent: Parent, index: usize, text: &str) -> DomainResult<NodeId> {
        self.insert_node(NodeData::Fragment(Fragment::from_signed(text)), parent, index)
    }

    /// Insert a group from its signed name; returns the new id.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_group(&mut self, parent: Parent, index: usize, name: &str) -> DomainResult<NodeId> {
        self.insert_node(NodeData::Group(Group::from_signed(name)), parent, index)
    }

    pub fn get(&self, id: NodeId) -> DomainResult<&NodeData> {
        Ok(&self.node(id)?.data)
    }

    pub fn fragment(&self, id: NodeId) -> DomainResult<&Fragment> {
        match self.get(id)? {
            NodeData::Fragment(f) => Ok(f),
            NodeData::Group(_) => Err(DomainError::NotAFragment(id)),
        }
    }

    pub fn group(&self, id: NodeId) -> DomainResult<&Group> {
        match self.get(id)? {
            NodeData::Group(g) => Ok(g),
            NodeData::Fragment(_) => Err(DomainError::NotAGroup(id)),
        }
    }

    pub fn parent_of(&self, id: NodeId) -> DomainResult<Parent> {
        Ok(self.node(id)?.parent_ref())
    }

    /// Position of `id` within its parent's sequence.
    pub fn index_of(&self, id: NodeId) -> DomainResult<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent)?
            .iter()
            .position(|&c| c == id)
            .ok_or(DomainError::NodeNotFound(id))
    }

    /// Returns whether the flag changed.
    #[instrument(level = "debug", skip(self))]
    pub fn set_enabled(&mut self, id: NodeId, value: bool) -> DomainResult<bool> {
        let enabled = self.node_mut(id)?.data.enabled_mut();
        Ok(std::mem::replace(enabled, value) != value)
    }

    /// Set a fragment's text from its signed view; the `n!` prefix decides the sign.
    #[instrument(level = "debug", skip(self))]
    pub fn set_text(&mut self, id: NodeId, value: &str) -> DomainResult<bool> {
        let fragment = self.fragment_mut(id)?;
        let (negative, text) = split_sign(value);
        let changed = fragment.text != text || fragment.negative != negative;
        fragment.text = text;
        fragment.negative = negative;
        Ok(changed)
    }

    /// Rename a group from its signed view; a blank name becomes `Group`.
    #[instrument(level = "debug", skip(self))]
    pub fn set_name(&mut self, id: NodeId, value: &str) -> DomainResult<bool> {
        let group = self.group_mut(id)?;
        let (negative, name) = normalize_name(value);
        let changed = group.name != name || group.negative != negative;
        group.name = name;
        group.negative = negative;
        Ok(changed)
    }

    /// Set a factor from raw input; non-numeric input clears it.
    #[instrument(level = "debug", skip(self))]
    pub fn set_factor(&mut self, id: NodeId, raw: &str) -> DomainResult<bool> {
        self.set_factor_value(id, Factor::parse(raw))
    }

    pub fn set_factor_value(&mut self, id: NodeId, factor: Option<Factor>) -> DomainResult<bool> {
        let slot = self.node_mut(id)?.data.factor_mut();
        Ok(std::mem::replace(slot, factor) != factor)
    }

    /// Flip the sign of a fragment or group; returns the new value.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle_negative(&mut self, id: NodeId) -> DomainResult<bool> {
        let negative = self.node_mut(id)?.data.negative_mut();
        *negative = !*negative;
        Ok(*negative)
    }

    pub fn set_negative(&mut self, id: NodeId, value: bool) -> DomainResult<bool> {
        let negative = self.node_mut(id)?.data.negative_mut();
        Ok(std::mem::replace(negative, value) != value)
    }

    pub fn signed_text(&self, id: NodeId) -> DomainResult<String> {
        Ok(self.fragment(id)?.signed_text())
    }

    pub fn signed_name(&self, id: NodeId) -> DomainResult<String> {
        Ok(self.group(id)?.signed_name())
    }

    /// Remove a node and its whole subtree; returns every removed id.
    ///
    /// Unknown ids are tolerated and remove nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_by_id(&mut self, id: NodeId) -> Vec<NodeId> {
        if self.detach(id).is_err() {
            debug!("remove_by_id: {} not in tree", id);
            return Vec::new();
        }
        self.free_subtree(id)
    }

    /// Move `id` under `parent` at `index`, measured after `id` left its old place.
    ///
    /// Rejects moving a group into itself or any of its descendants.
    /// Returns whether the position changed.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to(&mut self, id: NodeId, parent: Parent, index: usize) -> DomainResult<bool> {
        self.node(id)?;
        self.children(parent)?;
        if let Parent::Group(target) = parent {
            if self.is_ancestor_or_self(id, target) {
                return Err(DomainError::CycleDetected { node: id, target });
            }
        }
        let (old_parent, old_index) = self.detach(id)?;
        let new_index = self.attach(id, parent, index)?;
        Ok(old_parent != parent || old_index != new_index)
    }

    /// Drop `source` before or after its `target`.
    ///
    /// Siblings are reordered in place with the index-shift correction; a target under
    /// another parent pulls the source across into that parent.
    #[instrument(level = "debug", skip(self))]
    pub fn reorder(&mut self, source: NodeId, target: NodeId, placement: Placement) -> DomainResult<bool> {
        let source_parent = self.parent_of(source)?;
        let target_parent = self.parent_of(target)?;
        if source == target {
            return Ok(false);
        }
        if source_parent == target_parent {
            let source_index = self.index_of(source)?;
            let target_index = self.index_of(target)?;
            let siblings = self.children_mut(source_parent)?;
            return Ok(reorder::move_item(siblings, source_index, target_index, placement));
        }
        if let Parent::Group(g) = target_parent {
            if self.is_ancestor_or_self(source, g) {
                return Err(DomainError::CycleDetected { node: source, target: g });
            }
        }
        self.detach(source)?;
        // source lived elsewhere, so the target index is unaffected by the detach
        let target_index = self.index_of(target)?;
        let at = match placement {
            Placement::Before => target_index,
            Placement::After => target_index + 1,
        };
        self.attach(source, target_parent, at)?;
        Ok(true)
    }

    /// Remove every fragment whose trimmed text is empty. Never run implicitly.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_blank_fragments(&mut self) -> Vec<NodeId> {
        let blank: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| matches!(&node.data, NodeData::Fragment(f) if f.is_blank()))
            .map(|(id, _)| id)
            .collect();
        blank
            .into_iter()
            .flat_map(|id| self.remove_by_id(id))
            .collect()
    }

    /// Drop every node. Removed ids never resolve again.
    pub fn clear(&mut self) {
        self.clear_all();
    }

    /// Replace the whole content with `other`, as an import does.
    ///
    /// Nodes are copied into this arena under fresh ids, so ids handed out before
    /// the replacement stay dead.
    #[instrument(level = "debug", skip_all)]
    pub fn replace_with(&mut self, other: &Composition) {
        self.clear_all();
        for &root in other.roots() {
            self.graft(other, root, Parent::Root);
        }
    }

    fn graft(&mut self, source: &Composition, id: NodeId, parent: Parent) {
        let Some(node) = source.get_node(id) else {
            return;
        };
        if let Ok(new_id) = self.insert_node(node.data.clone(), parent, usize::MAX) {
            for &child in &node.children {
                self.graft(source, child, Parent::Group(new_id));
            }
        }
    }

    fn fragment_mut(&mut self, id: NodeId) -> DomainResult<&mut Fragment> {
        match &mut self.node_mut(id)?.data {
            NodeData::Fragment(f) => Ok(f),
            NodeData::Group(_) => Err(DomainError::NotAFragment(id)),
        }
    }

    fn group_mut(&mut self, id: NodeId) -> DomainResult<&mut Group> {
        match &mut self.node_mut(id)?.data {
            NodeData::Group(g) => Ok(g),
            NodeData::Fragment(_) => Err(DomainError::NotAGroup(id)),
        }
    }

    /// Child nodes of `parent` paired with their ids, in order.
    pub fn child_nodes(&self, parent: Parent) -> DomainResult<Vec<(NodeId, &TreeNode)>> {
        Ok(self
            .children(parent)?
            .iter()
            .filter_map(|&id| self.get_node(id).map(|node| (id, node)))
            .collect())
    }
}
