//! Staged statement changes.
//!
//! Multi-statement mutations (inverse mirroring, class-expression removal,
//! reasoner merges) are collected into a [`ChangeSet`] and applied in one
//! step. Application is all-or-nothing: if the store rejects a statement,
//! everything already applied is reverted.

use std::collections::HashSet;

use crate::ontology::OntologyId;
use crate::statement::Statement;
use crate::storage::{Detached, StatementStore, StorageError};

/// An ordered set of removals and additions.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    removes: Vec<Statement>,
    adds: Vec<(Statement, OntologyId)>,
    seen_removes: HashSet<Statement>,
    seen_adds: HashSet<Statement>,
}

/// What a committed change set actually changed in the store.
#[derive(Debug, Clone, Default)]
pub struct Applied {
    /// Statements that were present and got removed.
    pub removed: Vec<Statement>,
    /// Statements that were absent and got added.
    pub added: Vec<Statement>,
}

impl Applied {
    /// Returns true if the store was left unchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// Every statement touched, removals first.
    pub fn touched(&self) -> impl Iterator<Item = &Statement> {
        self.removed.iter().chain(self.added.iter())
    }
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an addition. A later removal of the same statement cancels it.
    pub fn add(&mut self, statement: Statement, owner: OntologyId) {
        if self.seen_removes.remove(&statement) {
            self.removes.retain(|s| s != &statement);
        }
        if self.seen_adds.insert(statement.clone()) {
            self.adds.push((statement, owner));
        }
    }

    /// Stages a removal. A pending addition of the same statement is dropped.
    pub fn remove(&mut self, statement: Statement) {
        if self.seen_adds.remove(&statement) {
            self.adds.retain(|(s, _)| s != &statement);
        }
        if self.seen_removes.insert(statement.clone()) {
            self.removes.push(statement);
        }
    }

    /// Stages a removal followed by a re-addition, so an existing statement
    /// ends up last in insertion order.
    pub fn move_to_end(&mut self, statement: Statement, owner: OntologyId) {
        if self.seen_removes.insert(statement.clone()) {
            self.removes.push(statement.clone());
        }
        if self.seen_adds.insert(statement.clone()) {
            self.adds.push((statement, owner));
        }
    }

    /// Stages the removal of every statement in `statements`.
    pub fn extend_removals(&mut self, statements: impl IntoIterator<Item = Statement>) {
        for statement in statements {
            self.remove(statement);
        }
    }

    /// Returns true if `statement` is staged for addition.
    #[must_use]
    pub fn adds_statement(&self, statement: &Statement) -> bool {
        self.seen_adds.contains(statement)
    }

    /// Returns true if `statement` is staged for removal.
    #[must_use]
    pub fn removes_statement(&self, statement: &Statement) -> bool {
        self.seen_removes.contains(statement)
    }

    /// Staged additions, in staging order.
    pub fn additions(&self) -> impl Iterator<Item = &Statement> {
        self.adds.iter().map(|(s, _)| s)
    }

    /// Staged removals, in staging order.
    pub fn removals(&self) -> impl Iterator<Item = &Statement> {
        self.removes.iter()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    /// Number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adds.len() + self.removes.len()
    }

    /// Applies removals, then additions.
    ///
    /// On failure every change already made is reverted, removed statements
    /// going back to their former insertion position, and the store error is
    /// returned.
    pub fn apply(self, store: &mut dyn StatementStore) -> Result<Applied, StorageError> {
        let mut removed: Vec<Detached> = Vec::new();
        for statement in &self.removes {
            if let Some(detached) = store.detach(statement) {
                removed.push(detached);
            }
        }

        let mut added: Vec<Statement> = Vec::new();
        for (statement, owner) in self.adds {
            match store.add(statement.clone(), owner) {
                Ok(true) => added.push(statement),
                Ok(false) => {}
                Err(err) => {
                    for statement in &added {
                        store.remove(statement);
                    }
                    let failed: Vec<String> = removed
                        .into_iter()
                        .filter_map(|detached| store.reattach(detached).err())
                        .map(|e| e.to_string())
                        .collect();
                    if failed.is_empty() {
                        return Err(err);
                    }
                    return Err(StorageError::BackendError(format!(
                        "{err}; rollback incomplete: {}",
                        failed.join("; ")
                    )));
                }
            }
        }

        Ok(Applied {
            removed: removed.into_iter().map(|d| d.statement).collect(),
            added,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::iri::Iri;
    use crate::storage::InMemoryStatementStore;
    use crate::value::Node;
    use crate::vocab;

    fn owner() -> OntologyId {
        OntologyId::for_iri(&Iri::parse("http://test.org/cs").unwrap())
    }

    fn typed(s: &str, c: &str) -> Statement {
        Statement::typed(
            Iri::parse(format!("http://test.org/cs#{s}")).unwrap(),
            Iri::parse(format!("http://test.org/cs#{c}")).unwrap(),
        )
    }

    #[test]
    fn removes_run_before_adds() {
        let mut store = InMemoryStatementStore::new();
        store.add(typed("a", "C"), owner()).unwrap();

        let mut cs = ChangeSet::new();
        cs.add(typed("a", "D"), owner());
        cs.remove(typed("a", "C"));
        cs.remove(typed("a", "missing"));
        let applied = cs.apply(&mut store).unwrap();

        assert_eq!(applied.removed, vec![typed("a", "C")]);
        assert_eq!(applied.added, vec![typed("a", "D")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn later_operation_cancels_earlier() {
        let mut cs = ChangeSet::new();
        cs.add(typed("a", "C"), owner());
        cs.remove(typed("a", "C"));
        assert!(!cs.adds_statement(&typed("a", "C")));
        assert!(cs.removes_statement(&typed("a", "C")));

        cs.add(typed("a", "C"), owner());
        cs.add(typed("a", "C"), owner());
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.additions().count(), 1);
        assert_eq!(cs.removals().count(), 0);
    }

    #[test]
    fn move_to_end_reorders_an_existing_statement() {
        let mut store = InMemoryStatementStore::new();
        for c in ["A", "B", "C"] {
            store.add(typed("a", c), owner()).unwrap();
        }
        let mut cs = ChangeSet::new();
        cs.move_to_end(typed("a", "A"), owner());
        assert!(cs.adds_statement(&typed("a", "A")));
        assert!(cs.removes_statement(&typed("a", "A")));
        let applied = cs.apply(&mut store).unwrap();
        assert_eq!(applied.removed, applied.added);

        let order: Vec<Statement> = store.iter().map(|(st, _)| st.clone()).collect();
        assert_eq!(order, vec![typed("a", "B"), typed("a", "C"), typed("a", "A")]);
    }

    #[test]
    fn rollback_keeps_value_order() {
        let mut store = InMemoryStatementStore::new();
        let a = Node::Iri(Iri::parse("http://test.org/cs#a").unwrap());
        let p = Iri::parse("http://test.org/cs#p").unwrap();
        let value = |v: &str| Statement::new(a.clone(), p.clone(), Node::from(v));
        for v in ["x", "y", "z"] {
            store.add(value(v), owner()).unwrap();
        }

        let mut cs = ChangeSet::new();
        cs.remove(value("x"));
        cs.remove(value("y"));
        cs.add(value("w"), owner());
        cs.add(
            Statement::new(Node::from("bad"), vocab::iri(vocab::RDFS_LABEL), Node::from("x")),
            owner(),
        );
        assert!(cs.apply(&mut store).is_err());

        let values: Vec<&str> = store
            .find(Some(&a), Some(&p), None)
            .filter_map(|st| st.object.as_str())
            .collect();
        assert_eq!(values, ["x", "y", "z"]);
    }

    #[test]
    fn failure_rolls_back_everything() {
        let mut store = InMemoryStatementStore::new();
        store.add(typed("a", "C"), owner()).unwrap();

        let mut cs = ChangeSet::new();
        cs.remove(typed("a", "C"));
        cs.add(typed("a", "D"), owner());
        cs.add(
            Statement::new(Node::from("bad"), vocab::iri(vocab::RDFS_LABEL), Node::from("x")),
            owner(),
        );
        assert!(cs.apply(&mut store).is_err());

        assert_eq!(store.len(), 1);
        assert!(store.contains(&typed("a", "C")));
        assert!(!store.contains(&typed("a", "D")));
    }
}
