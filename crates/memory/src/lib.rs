//! Workspace memory and persistence for ferrocode.
//!
//! - [`index`]: the in-memory workspace index, rebuilt by scanning the root
//! - [`retrieval`]: keyword scoring over the index, formatted as prompt context
//! - [`history`]: chat session stores
//! - [`profiles`]: agent profile store

pub mod history;
pub mod index;
pub mod keywords;
pub mod profiles;
pub mod retrieval;

pub use history::{FileSessionStore, InMemorySessionStore, SessionCollection};
pub use index::{IndexLimits, IndexStatus, IndexedFile, WorkspaceIndex};
pub use profiles::FileProfileStore;
pub use retrieval::{RetrievalEngine, ScoredFile};
