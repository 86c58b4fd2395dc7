//! Attribute-name to property lookup.
//!
//! Every object and data property gets an accessor under its local name when
//! declared. Setting an alias moves the accessor to the alias; the identifier
//! itself keeps resolving through the entity registry.

use std::collections::{BTreeSet, HashMap};

use crate::entity::Entity;
use crate::iri::Iri;

/// Maps attribute names to property identifiers.
#[derive(Debug, Default)]
pub struct AccessorRegistry {
    by_name: HashMap<String, BTreeSet<Iri>>,
    names: HashMap<Iri, String>,
}

impl AccessorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `property` under `name`, replacing any previous name.
    pub fn register(&mut self, property: &Entity, name: &str) {
        self.unregister(property.iri());
        self.by_name
            .entry(name.to_string())
            .or_default()
            .insert(property.iri().clone());
        self.names.insert(property.iri().clone(), name.to_string());
    }

    /// Drops the accessor of `property`, returning the name it was under.
    pub fn unregister(&mut self, property: &Iri) -> Option<String> {
        let name = self.names.remove(property)?;
        if let Some(set) = self.by_name.get_mut(&name) {
            set.remove(property);
            if set.is_empty() {
                self.by_name.remove(&name);
            }
        }
        Some(name)
    }

    /// Properties reachable under `name`, ordered by identifier.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Vec<Iri> {
        self.by_name
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The attribute name of `property`, if it has an accessor.
    #[must_use]
    pub fn name_of(&self, property: &Iri) -> Option<&str> {
        self.names.get(property).map(String::as_str)
    }

    /// Number of registered properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no property is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
