//! Identifier to handle registry.
//!
//! The registry is a bijection between identifiers and live [`Entity`]
//! handles: asking twice for the same identifier yields the identical handle.

use std::collections::{BTreeSet, HashMap};

use crate::entity::{Entity, EntityKind};
use crate::error::{OntoError, OntoResult};
use crate::iri::Iri;
use crate::ontology::OntologyId;
use crate::storage::StatementStore;
use crate::value::Node;
use crate::vocab;

/// Maps identifiers to entity handles.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    by_iri: HashMap<Iri, Entity>,
    by_name: HashMap<String, BTreeSet<Iri>>,
    aliases: HashMap<Iri, String>,
}

impl EntityRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `iri`, creating it if needed.
    ///
    /// The boolean is true when the handle was created by this call.
    ///
    /// # Errors
    /// - `KindConflict`: the identifier is registered under another kind
    pub fn get_or_create(
        &mut self,
        iri: &Iri,
        kind: EntityKind,
        owner: OntologyId,
    ) -> OntoResult<(Entity, bool)> {
        if let Some(existing) = self.by_iri.get(iri) {
            if existing.kind() != kind {
                return Err(OntoError::KindConflict {
                    iri: iri.clone(),
                    existing: existing.kind(),
                    requested: kind,
                });
            }
            return Ok((existing.clone(), false));
        }

        let entity = Entity::new(iri.clone(), kind, Some(owner));
        self.index(&entity);
        Ok((entity, true))
    }

    /// Checks that `iri` could be registered as `kind` without creating it.
    pub fn check_kind(&self, iri: &Iri, kind: EntityKind) -> OntoResult<()> {
        match self.by_iri.get(iri) {
            Some(existing) if existing.kind() != kind => Err(OntoError::KindConflict {
                iri: iri.clone(),
                existing: existing.kind(),
                requested: kind,
            }),
            _ => Ok(()),
        }
    }

    /// Registers a fusion class under its synthetic identifier.
    pub(crate) fn insert_fusion(&mut self, iri: Iri, bases: Vec<Entity>) -> Entity {
        if let Some(existing) = self.by_iri.get(&iri) {
            return existing.clone();
        }
        let entity = Entity::fusion(iri, bases);
        self.by_iri.insert(entity.iri().clone(), entity.clone());
        entity
    }

    /// Registers a vocabulary entity owned by the built-in ontology.
    pub(crate) fn register_builtin(&mut self, iri: Iri, kind: EntityKind, owner: OntologyId) -> Entity {
        if let Some(existing) = self.by_iri.get(&iri) {
            return existing.clone();
        }
        let entity = Entity::new(iri, kind, Some(owner));
        self.index(&entity);
        entity
    }

    fn index(&mut self, entity: &Entity) {
        self.by_iri.insert(entity.iri().clone(), entity.clone());
        self.by_name
            .entry(entity.name().to_string())
            .or_default()
            .insert(entity.iri().clone());
    }

    /// Looks up a handle; `None` if the identifier is unknown.
    #[must_use]
    pub fn resolve(&self, iri: &Iri) -> Option<Entity> {
        self.by_iri.get(iri).cloned()
    }

    /// Looks up a handle or fails with `NotFound`.
    pub fn require(&self, iri: &Iri) -> OntoResult<Entity> {
        self.resolve(iri)
            .ok_or_else(|| OntoError::not_found(format!("entity {iri}")))
    }

    /// Entities whose display name (alias, or local name when no alias is set) is `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<Entity> {
        let mut out: Vec<Entity> = self
            .by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|iri| self.by_iri.get(iri))
            .filter(|e| self.display_name(e) == name)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.iri().cmp(b.iri()));
        out
    }

    /// Registers an alias; the alias supersedes the local name as display name.
    pub fn set_alias(&mut self, entity: &Entity, alias: &str) {
        if let Some(previous) = self.aliases.insert(entity.iri().clone(), alias.to_string()) {
            if previous != entity.name() {
                if let Some(set) = self.by_name.get_mut(&previous) {
                    set.remove(entity.iri());
                }
            }
        }
        self.by_name
            .entry(alias.to_string())
            .or_default()
            .insert(entity.iri().clone());
    }

    /// Removes an alias, restoring the local name.
    pub fn clear_alias(&mut self, entity: &Entity) -> Option<String> {
        let previous = self.aliases.remove(entity.iri())?;
        if previous != entity.name() {
            if let Some(set) = self.by_name.get_mut(&previous) {
                set.remove(entity.iri());
            }
        }
        Some(previous)
    }

    /// The alias of `entity`, if one is set.
    #[must_use]
    pub fn alias_of(&self, entity: &Entity) -> Option<&str> {
        self.aliases.get(entity.iri()).map(String::as_str)
    }

    /// The name used for attribute-style access and annotation shorthands.
    #[must_use]
    pub fn display_name<'a>(&'a self, entity: &'a Entity) -> &'a str {
        self.alias_of(entity).unwrap_or_else(|| entity.name())
    }

    /// Removes an entity; later requests for the identifier create a new handle.
    pub fn remove(&mut self, iri: &Iri) -> Option<Entity> {
        let entity = self.by_iri.remove(iri)?;
        if let Some(set) = self.by_name.get_mut(entity.name()) {
            set.remove(iri);
        }
        if let Some(alias) = self.aliases.remove(iri) {
            if let Some(set) = self.by_name.get_mut(&alias) {
                set.remove(iri);
            }
        }
        Some(entity)
    }

    /// Creates handles for every entity declared in the store.
    ///
    /// Declarations owned by `owner` create entities owned by it; existing
    /// handles are kept. Returns the newly created handles.
    pub fn materialize(
        &mut self,
        store: &dyn StatementStore,
        owner: OntologyId,
    ) -> OntoResult<Vec<Entity>> {
        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let declarations: Vec<(Iri, EntityKind)> = store
            .find(None, Some(&rdf_type), None)
            .filter(|st| store.owner(st) == Some(owner))
            .filter_map(|st| {
                let kind = EntityKind::from_declaration(st.object.as_iri()?.as_str())?;
                Some((st.subject.as_iri()?.clone(), kind))
            })
            .collect();

        let mut created = Vec::new();
        for (iri, kind) in declarations {
            let (entity, fresh) = self.get_or_create(&iri, kind, owner)?;
            if fresh {
                created.push(entity);
            }
        }
        Ok(created)
    }

    /// Returns true if the store holds a declaration for `iri`.
    #[must_use]
    pub fn is_declared(store: &dyn StatementStore, iri: &Iri) -> bool {
        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let subject = Node::Iri(iri.clone());
        let declared = store
            .find(Some(&subject), Some(&rdf_type), None)
            .any(|st| {
                st.object
                    .as_iri()
                    .is_some_and(|o| EntityKind::from_declaration(o.as_str()).is_some())
            });
        declared
    }

    /// All registered entities owned by `owner`.
    #[must_use]
    pub fn owned_by(&self, owner: OntologyId) -> Vec<Entity> {
        let mut out: Vec<Entity> = self
            .by_iri
            .values()
            .filter(|e| e.owner() == Some(owner))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.iri().cmp(b.iri()));
        out
    }

    /// Number of registered handles, fusion classes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_iri.len()
    }

    /// Returns true if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_iri.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::statement::Statement;
    use crate::storage::InMemoryStatementStore;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    fn owner() -> OntologyId {
        OntologyId::for_iri(&iri("http://test.org/onto"))
    }

    #[test]
    fn same_identifier_same_handle() {
        let mut reg = EntityRegistry::new();
        let (a, fresh) = reg
            .get_or_create(&iri("http://test.org/onto#A"), EntityKind::Class, owner())
            .unwrap();
        assert!(fresh);
        let (b, fresh) = reg
            .get_or_create(&iri("http://test.org/onto#A"), EntityKind::Class, owner())
            .unwrap();
        assert!(!fresh);
        assert!(a.same(&b));
        assert!(reg.resolve(a.iri()).unwrap().same(&a));
    }

    #[test]
    fn kind_conflict_is_reported() {
        let mut reg = EntityRegistry::new();
        let id = iri("http://test.org/onto#A");
        reg.get_or_create(&id, EntityKind::Class, owner()).unwrap();
        let err = reg
            .get_or_create(&id, EntityKind::Individual, owner())
            .unwrap_err();
        assert!(err.is_kind_conflict());
        assert!(reg.check_kind(&id, EntityKind::ObjectProperty).is_err());
        assert!(reg.check_kind(&id, EntityKind::Class).is_ok());
    }

    #[test]
    fn require_reports_not_found() {
        let reg = EntityRegistry::new();
        assert!(reg.resolve(&iri("http://test.org/onto#X")).is_none());
        assert!(reg.require(&iri("http://test.org/onto#X")).unwrap_err().is_not_found());
    }

    #[test]
    fn alias_supersedes_local_name() {
        let mut reg = EntityRegistry::new();
        let (p, _) = reg
            .get_or_create(
                &iri("http://test.org/onto#has_for_obj"),
                EntityKind::ObjectProperty,
                owner(),
            )
            .unwrap();
        assert_eq!(reg.find_by_name("has_for_obj").len(), 1);

        reg.set_alias(&p, "obj");
        assert_eq!(reg.display_name(&p), "obj");
        assert_eq!(reg.find_by_name("obj"), vec![p.clone()]);
        assert!(reg.find_by_name("has_for_obj").is_empty());
        assert!(reg.resolve(p.iri()).is_some());

        assert_eq!(reg.clear_alias(&p).as_deref(), Some("obj"));
        assert_eq!(reg.find_by_name("has_for_obj"), vec![p]);
    }

    #[test]
    fn materialize_creates_declared_entities() {
        let mut store = InMemoryStatementStore::new();
        let c = iri("http://test.org/onto#C");
        store
            .add(Statement::typed(c.clone(), vocab::iri(vocab::OWL_CLASS)), owner())
            .unwrap();
        assert!(EntityRegistry::is_declared(&store, &c));

        let mut reg = EntityRegistry::new();
        let created = reg.materialize(&store, owner()).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind(), EntityKind::Class);
        assert!(reg.materialize(&store, owner()).unwrap().is_empty());
        assert_eq!(reg.owned_by(owner()).len(), 1);
    }
}
