//! Abstract statement storage.
//!
//! The statement store is the single source of truth: every higher-level view
//! (types, property values, class expressions) is derived from it by filtering
//! statements by predicate.

use thiserror::Error;

use crate::iri::Iri;
use crate::ontology::OntologyId;
use crate::statement::Statement;
use crate::value::Node;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A literal was used in subject position.
    #[error("Invalid statement subject: {0}")]
    InvalidSubject(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// A statement taken out of a store, with what is needed to put it back
/// where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// The removed statement.
    pub statement: Statement,
    /// The ontology that owned it.
    pub owner: OntologyId,
    /// Its insertion position in the store that detached it.
    pub position: u64,
}

/// Lazy sequence of matching statements.
pub type Statements<'a> = Box<dyn Iterator<Item = &'a Statement> + 'a>;

/// Storage trait for statements.
///
/// Implementations must preserve insertion order in `find` and `iter`, so that
/// multi-valued properties read back in the order they were asserted.
pub trait StatementStore: Send {
    /// Adds a statement owned by `owner`.
    ///
    /// Returns `Ok(false)` if the identical statement already exists; the
    /// original owner is kept.
    fn add(&mut self, statement: Statement, owner: OntologyId) -> Result<bool, StorageError>;

    /// Removes a statement. Removing an absent statement is a no-op that returns `false`.
    fn remove(&mut self, statement: &Statement) -> bool;

    /// Removes a statement, keeping its owner and insertion position.
    fn detach(&mut self, statement: &Statement) -> Option<Detached>;

    /// Puts back a statement returned by [`StatementStore::detach`] at its
    /// former position.
    ///
    /// Returns `Ok(false)` if the identical statement was added again meanwhile.
    fn reattach(&mut self, detached: Detached) -> Result<bool, StorageError>;

    /// Returns true if the exact statement exists.
    fn contains(&self, statement: &Statement) -> bool;

    /// Finds statements matching the pattern; `None` is a wildcard.
    fn find<'a>(
        &'a self,
        subject: Option<&'a Node>,
        predicate: Option<&'a Iri>,
        object: Option<&'a Node>,
    ) -> Statements<'a>;

    /// Returns the ontology owning a statement.
    fn owner(&self, statement: &Statement) -> Option<OntologyId>;

    /// Removes every statement owned by `owner`, returning them in insertion order.
    fn remove_owned_by(&mut self, owner: OntologyId) -> Vec<Statement>;

    /// Enumerates all statements with their owners in insertion order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&Statement, OntologyId)> + '_>;

    /// Number of statements.
    fn len(&self) -> usize;

    /// Returns true if the store holds no statements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
