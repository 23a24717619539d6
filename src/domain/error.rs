//! Domain-level errors (no I/O concerns)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors represent rejected tree operations.
///
/// A mutation that returns one of these has not touched the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node is not a group: {0}")]
    NotAGroup(NodeId),

    #[error("node is not a fragment: {0}")]
    NotAFragment(NodeId),

    #[error("cannot move {node} into its own subtree at {target}")]
    CycleDetected { node: NodeId, target: NodeId },
}

/// Result type for tree operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Error reading a serialized composition.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}
