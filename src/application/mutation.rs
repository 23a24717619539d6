//! Mutation intents and the change descriptions they produce
//!
//! A host turns each user gesture into one [`Mutation`], applies it, and inspects the
//! returned [`Change`] to decide whether to recompile and persist.

use tracing::instrument;

use crate::domain::{Composition, DomainResult, NodeId, Parent, Placement};

/// One edit of the composition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    InsertFragment { parent: Parent, index: usize, text: String },
    InsertGroup { parent: Parent, index: usize, name: String },
    SetEnabled { id: NodeId, enabled: bool },
    /// Signed view: a leading `n!` makes the fragment negative
    SetText { id: NodeId, text: String },
    SetName { id: NodeId, name: String },
    /// Raw user input, normalized on write
    SetFactor { id: NodeId, raw: String },
    ToggleNegative { id: NodeId },
    Remove { id: NodeId },
    MoveTo { id: NodeId, parent: Parent, index: usize },
    Reorder { source: NodeId, target: NodeId, placement: Placement },
    RemoveBlankFragments,
}

/// What a successful mutation did to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted(NodeId),
    Updated(NodeId),
    Removed { ids: Vec<NodeId> },
    Moved(NodeId),
    Unchanged,
}

impl Change {
    pub fn is_noop(&self) -> bool {
        match self {
            Change::Unchanged => true,
            Change::Removed { ids } => ids.is_empty(),
            _ => false,
        }
    }

    fn updated_if(changed: bool, id: NodeId) -> Change {
        if changed {
            Change::Updated(id)
        } else {
            Change::Unchanged
        }
    }

    fn moved_if(changed: bool, id: NodeId) -> Change {
        if changed {
            Change::Moved(id)
        } else {
            Change::Unchanged
        }
    }
}

impl Mutation {
    /// Apply to `tree`. On `Err` the tree is unchanged.
    #[instrument(level = "debug", skip(tree))]
    pub fn apply(&self, tree: &mut Composition) -> DomainResult<Change> {
        let change = match self {
            Mutation::InsertFragment { parent, index, text } => {
                Change::Inserted(tree.insert_fragment(*parent, *index, text)?)
            }
            Mutation::InsertGroup { parent, index, name } => {
                Change::Inserted(tree.insert_group(*parent, *index, name)?)
            }
            Mutation::SetEnabled { id, enabled } => {
                Change::updated_if(tree.set_enabled(*id, *enabled)?, *id)
            }
            Mutation::SetText { id, text } => Change::updated_if(tree.set_text(*id, text)?, *id),
            Mutation::SetName { id, name } => Change::updated_if(tree.set_name(*id, name)?, *id),
            Mutation::SetFactor { id, raw } => Change::updated_if(tree.set_factor(*id, raw)?, *id),
            Mutation::ToggleNegative { id } => {
                tree.toggle_negative(*id)?;
                Change::Updated(*id)
            }
            Mutation::Remove { id } => Change::Removed {
                ids: tree.remove_by_id(*id),
            },
            Mutation::MoveTo { id, parent, index } => {
                Change::moved_if(tree.move_to(*id, *parent, *index)?, *id)
            }
            Mutation::Reorder {
                source,
                target,
                placement,
            } => Change::moved_if(tree.reorder(*source, *target, *placement)?, *source),
            Mutation::RemoveBlankFragments => Change::Removed {
                ids: tree.remove_blank_fragments(),
            },
        };
        Ok(change)
    }
}
