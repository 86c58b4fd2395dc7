//! Statement storage.
//!
//! The trait defines the contract; [`InMemoryStatementStore`] is the embedded
//! backend used by [`crate::World`].

mod memory;
mod traits;

pub use memory::InMemoryStatementStore;
pub use traits::{Detached, StatementStore, Statements, StorageError};
