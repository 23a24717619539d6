//! Domain layer: the composition tree and the pure algorithms over it
//!
//! This layer is independent of external concerns (no I/O, no storage, no config loading).

pub mod arena;
pub mod compiler;
pub mod composition;
pub mod display;
pub mod entities;
pub mod error;
pub mod reorder;
pub mod snapshot;

pub use arena::{Composition, NodeData, NodeId, Parent, TreeNode};
pub use compiler::{compile, compile_node, CompiledPrompt, FactorPolicy, Prompt};
pub use display::TreeNodeConvert;
pub use entities::*;
pub use error::{DomainError, DomainResult, SnapshotError};
pub use reorder::{DropLocus, Placement};
