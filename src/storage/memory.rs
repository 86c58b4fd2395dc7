//! In-memory storage backend.
//!
//! Statements live in a sequence-ordered arena with subject, predicate and
//! object indexes. Lookups pick the narrowest index and filter the rest.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::iri::Iri;
use crate::ontology::OntologyId;
use crate::statement::Statement;
use crate::storage::traits::{Detached, StatementStore, Statements, StorageError};
use crate::value::Node;

#[derive(Debug)]
struct Entry {
    statement: Statement,
    owner: OntologyId,
}

fn matches(statement: &Statement, s: Option<&Node>, p: Option<&Iri>, o: Option<&Node>) -> bool {
    s.map_or(true, |s| &statement.subject == s)
        && p.map_or(true, |p| &statement.predicate == p)
        && o.map_or(true, |o| &statement.object == o)
}

fn index_insert<K: std::hash::Hash + Eq>(index: &mut HashMap<K, BTreeSet<u64>>, key: K, seq: u64) {
    index.entry(key).or_default().insert(seq);
}

fn index_remove<K: std::hash::Hash + Eq>(index: &mut HashMap<K, BTreeSet<u64>>, key: &K, seq: u64) {
    if let Some(set) = index.get_mut(key) {
        set.remove(&seq);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

/// In-memory statement store.
#[derive(Debug, Default)]
pub struct InMemoryStatementStore {
    next_seq: u64,
    entries: BTreeMap<u64, Entry>,
    by_statement: HashMap<Statement, u64>,
    by_subject: HashMap<Node, BTreeSet<u64>>,
    by_predicate: HashMap<Iri, BTreeSet<u64>>,
    by_object: HashMap<Node, BTreeSet<u64>>,
}

impl InMemoryStatementStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_at(&mut self, seq: u64, statement: Statement, owner: OntologyId) {
        index_insert(&mut self.by_subject, statement.subject.clone(), seq);
        index_insert(&mut self.by_predicate, statement.predicate.clone(), seq);
        index_insert(&mut self.by_object, statement.object.clone(), seq);
        self.by_statement.insert(statement.clone(), seq);
        self.entries.insert(seq, Entry { statement, owner });
    }

    fn remove_seq(&mut self, seq: u64) -> Option<Entry> {
        let entry = self.entries.remove(&seq)?;
        self.by_statement.remove(&entry.statement);
        index_remove(&mut self.by_subject, &entry.statement.subject, seq);
        index_remove(&mut self.by_predicate, &entry.statement.predicate, seq);
        index_remove(&mut self.by_object, &entry.statement.object, seq);
        Some(entry)
    }
}

impl StatementStore for InMemoryStatementStore {
    fn add(&mut self, statement: Statement, owner: OntologyId) -> Result<bool, StorageError> {
        if !statement.subject.is_resource() {
            return Err(StorageError::InvalidSubject(statement.subject.to_string()));
        }
        if self.by_statement.contains_key(&statement) {
            return Ok(false);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert_at(seq, statement, owner);
        Ok(true)
    }

    fn detach(&mut self, statement: &Statement) -> Option<Detached> {
        let seq = self.by_statement.get(statement).copied()?;
        let entry = self.remove_seq(seq)?;
        Some(Detached {
            statement: entry.statement,
            owner: entry.owner,
            position: seq,
        })
    }

    fn reattach(&mut self, detached: Detached) -> Result<bool, StorageError> {
        if self.by_statement.contains_key(&detached.statement) {
            return Ok(false);
        }
        if detached.position >= self.next_seq || self.entries.contains_key(&detached.position) {
            return Err(StorageError::BackendError(format!(
                "position {} was not detached from this store",
                detached.position
            )));
        }
        self.insert_at(detached.position, detached.statement, detached.owner);
        Ok(true)
    }

    fn remove(&mut self, statement: &Statement) -> bool {
        match self.by_statement.get(statement).copied() {
            Some(seq) => self.remove_seq(seq).is_some(),
            None => false,
        }
    }

    fn contains(&self, statement: &Statement) -> bool {
        self.by_statement.contains_key(statement)
    }

    fn find<'a>(
        &'a self,
        subject: Option<&'a Node>,
        predicate: Option<&'a Iri>,
        object: Option<&'a Node>,
    ) -> Statements<'a> {
        let candidates = match (subject, object, predicate) {
            (Some(s), _, _) => self.by_subject.get(s),
            (None, Some(o), _) => self.by_object.get(o),
            (None, None, Some(p)) => self.by_predicate.get(p),
            (None, None, None) => {
                return Box::new(self.entries.values().map(|e| &e.statement));
            }
        };

        let Some(seqs) = candidates else {
            return Box::new(std::iter::empty());
        };

        Box::new(
            seqs.iter()
                .filter_map(move |seq| self.entries.get(seq))
                .map(|e| &e.statement)
                .filter(move |st| matches(st, subject, predicate, object)),
        )
    }

    fn owner(&self, statement: &Statement) -> Option<OntologyId> {
        let seq = self.by_statement.get(statement)?;
        self.entries.get(seq).map(|e| e.owner)
    }

    fn remove_owned_by(&mut self, owner: OntologyId) -> Vec<Statement> {
        let seqs: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.owner == owner)
            .map(|(seq, _)| *seq)
            .collect();
        seqs.into_iter()
            .filter_map(|seq| self.remove_seq(seq))
            .map(|e| e.statement)
            .collect()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&Statement, OntologyId)> + '_> {
        Box::new(self.entries.values().map(|e| (&e.statement, e.owner)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
