//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (KeyValueStore, HostFields, FileSystem)
//! but are themselves concrete structs, not traits.

mod session;
mod transfer;

pub use session::{seed_tree, Applied, PromptSession, SessionOrigin, SyncReport};
pub use transfer::TransferService;
