//! prompt-kun: compose weighted, signed image-generation prompts from a tree of
//! reusable fragments.
//!
//! The [`domain`] layer holds the composition tree, the compiler turning it into a
//! positive and a negative prompt string, the reorder engine and the snapshot
//! serializer. [`application`] wraps the tree in an editing session that pushes
//! every change to the host and persists it; [`infrastructure`] provides the storage
//! and host-field adapters.
//!
//! ```ignore
//! let container = ServiceContainer::new(Settings::load(None)?, Arc::new(MemoryFields::new()))?;
//! let mut session = container.start_session();
//! session.apply(&Mutation::InsertFragment { parent: Parent::Root, index: 0, text: "n!blurry".into() })?;
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod util;

pub use application::services::{Applied, PromptSession, SessionOrigin, SyncReport, TransferService};
pub use application::{ApplicationError, ApplicationResult, Change, Mutation};
pub use config::Settings;
pub use domain::{
    compile, CompiledPrompt, Composition, DomainError, DomainResult, Factor, FactorPolicy, NodeId,
    Parent, Placement, Prompt,
};
pub use infrastructure::di::ServiceContainer;
pub use infrastructure::{InfraError, InfraResult};
