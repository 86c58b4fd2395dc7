//! The world: one statement store shared by every ontology.
//!
//! [`World`] owns the statement store and the views derived from it (entity
//! registry, fusion class manager, accessor registry) and is the only way to
//! mutate them. Annotations are ordinary statements. Every statement mutation
//! goes through [`World::commit`], which drops the annotations of removed
//! statements and re-derives the fusion binding of each individual whose
//! types changed.

mod annotate;
mod declare;
mod typing;
mod values;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::annotation::axioms_of;
use crate::changeset::{Applied, ChangeSet};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityKind};
use crate::error::{OntoError, OntoResult, ValidationError};
use crate::fusion::{FusionClassManager, Rebind};
use crate::iri::Iri;
use crate::ontology::{Ontology, OntologyId};
use crate::property::AccessorRegistry;
use crate::reasoner::SyncState;
use crate::registry::EntityRegistry;
use crate::statement::Statement;
use crate::storage::{InMemoryStatementStore, StatementStore};
use crate::value::Node;
use crate::vocab;

pub use declare::PropertyOptions;

/// Facade over the statement store and its derived views.
///
/// # Examples
///
/// ```
/// use ontosync::World;
///
/// let mut world = World::new();
/// let onto = world.ontology("http://test.org/onto.owl").unwrap();
/// let c1 = world.declare_class(&onto, "C1", &[]).unwrap();
/// let c2 = world.declare_class(&onto, "C2", &[]).unwrap();
///
/// let o = world.create_individual(&onto, Some("o"), &[&c1]).unwrap();
/// world.add_is_a(&o, &c2).unwrap();
/// assert!(world.type_of(&o).unwrap().is_fusion());
/// assert!(world.is_instance_of(&o, &c1));
/// assert!(world.is_instance_of(&o, &c2));
/// ```
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) statements: Box<dyn StatementStore>,
    pub(crate) registry: EntityRegistry,
    pub(crate) fusion: FusionClassManager,
    pub(crate) accessors: AccessorRegistry,
    pub(crate) ontologies: BTreeMap<Iri, Ontology>,
    pub(crate) builtin: Ontology,
    pub(crate) thing: Entity,
    pub(crate) sync_state: SyncState,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration and an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default(), Box::new(InMemoryStatementStore::new()))
    }

    /// Creates a world with `config`.
    pub fn with_config(config: WorldConfig) -> OntoResult<Self> {
        Self::with_store(config, Box::new(InMemoryStatementStore::new()))
    }

    /// Creates a world over a caller-provided statement store.
    pub fn with_store(config: WorldConfig, statements: Box<dyn StatementStore>) -> OntoResult<Self> {
        config.validate()?;
        Ok(Self::build(config, statements))
    }

    fn build(config: WorldConfig, statements: Box<dyn StatementStore>) -> Self {
        let builtin = Ontology::new(vocab::iri(vocab::BUILTIN_ONTOLOGY));
        let mut registry = EntityRegistry::new();
        let thing = registry.register_builtin(
            vocab::iri(vocab::OWL_THING),
            EntityKind::Class,
            builtin.id(),
        );
        for iri in [vocab::RDFS_COMMENT, vocab::RDFS_LABEL, vocab::ALIAS] {
            registry.register_builtin(vocab::iri(iri), EntityKind::AnnotationProperty, builtin.id());
        }

        Self {
            config,
            statements,
            registry,
            fusion: FusionClassManager::new(),
            accessors: AccessorRegistry::new(),
            ontologies: BTreeMap::new(),
            builtin,
            thing,
            sync_state: SyncState::Idle,
        }
    }

    /// The configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The root class, `owl:Thing`.
    #[must_use]
    pub fn thing(&self) -> &Entity {
        &self.thing
    }

    /// Returns the ontology named `iri`, creating an empty one if needed.
    pub fn ontology(&mut self, iri: &str) -> OntoResult<Ontology> {
        let iri = Iri::parse(iri)?;
        if let Some(existing) = self.ontologies.get(&iri) {
            return Ok(existing.clone());
        }
        let onto = Ontology::new(iri.clone());
        info!(ontology = %iri, "created ontology");
        self.ontologies.insert(iri, onto.clone());
        Ok(onto)
    }

    /// The live ontology named `iri`, without creating it.
    #[must_use]
    pub fn get_ontology(&self, iri: &str) -> Option<Ontology> {
        let iri = Iri::parse(iri).ok()?;
        self.ontologies.get(&iri).cloned()
    }

    /// Every live ontology, ordered by identifier.
    #[must_use]
    pub fn ontologies(&self) -> Vec<Ontology> {
        self.ontologies.values().cloned().collect()
    }

    pub(crate) fn ontology_by_id(&self, id: OntologyId) -> Option<&Ontology> {
        if id == self.builtin.id() {
            return Some(&self.builtin);
        }
        self.ontologies.values().find(|o| o.id() == id)
    }

    pub(crate) fn require_live(&self, onto: &Ontology) -> OntoResult<()> {
        match self.ontologies.get(onto.iri()) {
            Some(live) if live == onto => Ok(()),
            _ => Err(OntoError::not_found(format!("ontology {}", onto.iri()))),
        }
    }

    /// The ontology that owns statements written about `entity`.
    pub(crate) fn owner_of(&self, entity: &Entity) -> OntologyId {
        entity.owner().unwrap_or_else(|| self.builtin.id())
    }

    fn is_referenced(&self, iri: &Iri) -> bool {
        let node = Node::Iri(iri.clone());
        self.statements.find(Some(&node), None, None).next().is_some()
            || self.statements.find(None, None, Some(&node)).next().is_some()
            || self.statements.find(None, Some(iri), None).next().is_some()
    }

    /// Destroys an ontology.
    ///
    /// Its statements are removed, annotations included; entities it owned that no remaining statement mentions are dropped from
    /// the registry. Returns the number of statements removed.
    pub fn destroy_ontology(&mut self, onto: &Ontology) -> OntoResult<usize> {
        self.require_live(onto)?;
        self.ontologies.remove(onto.iri());

        let removed = self.statements.remove_owned_by(onto.id());
        let owned: BTreeSet<Iri> = self
            .registry
            .owned_by(onto.id())
            .iter()
            .map(|e| e.iri().clone())
            .collect();

        let mut dropped: Vec<Iri> = Vec::new();
        for iri in &owned {
            if !self.is_referenced(iri) {
                self.registry.remove(iri);
                self.accessors.unregister(iri);
                self.fusion.unbind(iri);
                dropped.push(iri.clone());
            }
        }
        let stale = self.fusion.purge(&dropped, &mut self.registry);

        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let survivors: BTreeSet<Iri> = removed
            .iter()
            .filter(|st| st.predicate == rdf_type)
            .filter_map(|st| st.subject.as_iri().cloned())
            .collect();
        for iri in survivors {
            if let Some(entity) = self.registry.resolve(&iri) {
                if entity.is_individual() {
                    self.refresh_types(&entity);
                }
            }
        }

        info!(
            ontology = %onto.iri(),
            statements = removed.len(),
            entities = dropped.len(),
            fusion_classes = stale.len(),
            "destroyed ontology"
        );
        Ok(removed.len())
    }

    /// Looks up the handle of an identifier.
    #[must_use]
    pub fn resolve(&self, iri: &Iri) -> Option<Entity> {
        self.registry.resolve(iri)
    }

    /// Looks up a handle from identifier text.
    #[must_use]
    pub fn resolve_str(&self, iri: &str) -> Option<Entity> {
        Iri::parse(iri).ok().and_then(|iri| self.registry.resolve(&iri))
    }

    /// Looks up a handle or fails with `NotFound`.
    pub fn require(&self, iri: &Iri) -> OntoResult<Entity> {
        self.registry.require(iri)
    }

    /// The entity `name` of `onto`, by local name or alias.
    #[must_use]
    pub fn entity(&self, onto: &Ontology, name: &str) -> Option<Entity> {
        if let Some(found) = onto
            .entity_iri(name)
            .ok()
            .and_then(|iri| self.registry.resolve(&iri))
        {
            return Some(found);
        }
        self.registry
            .find_by_name(name)
            .into_iter()
            .find(|e| e.owner() == Some(onto.id()))
    }

    /// Entities whose display name is `name`, across ontologies.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<Entity> {
        self.registry.find_by_name(name)
    }

    /// Statements matching a pattern; `None` is a wildcard.
    #[must_use]
    pub fn statements(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Iri>,
        object: Option<&Node>,
    ) -> Vec<Statement> {
        self.statements
            .find(subject, predicate, object)
            .cloned()
            .collect()
    }

    /// Number of statements in the store, annotations included.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Statements owned by `onto`, in insertion order.
    #[must_use]
    pub fn statements_of(&self, onto: &Ontology) -> Vec<Statement> {
        self.statements
            .iter()
            .filter(|(_, owner)| *owner == onto.id())
            .map(|(st, _)| st.clone())
            .collect()
    }

    /// Adds a raw statement owned by `onto`.
    ///
    /// Declarations (`rdf:type owl:Class` and the like) register the subject
    /// and fail with `KindConflict` before touching the store.
    pub fn add_statement(&mut self, onto: &Ontology, statement: Statement) -> OntoResult<bool> {
        self.require_live(onto)?;
        if !statement.subject.is_resource() {
            return Err(ValidationError::LiteralSubject.into());
        }
        if statement.has_predicate(vocab::RDF_TYPE) {
            let kind = statement
                .object
                .as_iri()
                .and_then(|o| EntityKind::from_declaration(o.as_str()));
            if let (Some(kind), Some(subject)) = (kind, statement.subject.as_iri()) {
                let (entity, fresh) = self.registry.get_or_create(subject, kind, onto.id())?;
                if fresh && matches!(kind, EntityKind::ObjectProperty | EntityKind::DataProperty) {
                    self.accessors.register(&entity, entity.name());
                }
            }
        }
        let mut cs = ChangeSet::new();
        cs.add(statement, onto.id());
        Ok(!self.commit(cs)?.added.is_empty())
    }

    /// Removes a raw statement; removing an absent statement returns false.
    pub fn remove_statement(&mut self, statement: &Statement) -> OntoResult<bool> {
        let mut cs = ChangeSet::new();
        cs.remove(statement.clone());
        Ok(!self.commit(cs)?.removed.is_empty())
    }

    /// Applies a change set and re-derives the live type of every individual
    /// whose `rdf:type` statements changed.
    ///
    /// A statement removed for good takes its axiom nodes, and the annotations
    /// on them, along in the same change set.
    pub(crate) fn commit(&mut self, mut cs: ChangeSet) -> OntoResult<Applied> {
        if cs.is_empty() {
            return Ok(Applied::default());
        }
        let axioms: Vec<Node> = cs
            .removals()
            .filter(|st| !cs.adds_statement(st) && self.statements.contains(st))
            .flat_map(|st| axioms_of(self.statements.as_ref(), st))
            .collect();
        let mut cascade: Vec<Statement> = Vec::new();
        for axiom in &axioms {
            cascade.extend(self.statements.find(Some(axiom), None, None).cloned());
        }
        cs.extend_removals(cascade);
        let applied = cs.apply(self.statements.as_mut())?;

        let alias = vocab::iri(vocab::ALIAS);
        let aliased: BTreeSet<Iri> = applied
            .touched()
            .filter(|st| st.predicate == alias)
            .filter_map(|st| st.subject.as_iri().cloned())
            .collect();
        for iri in &aliased {
            self.sync_alias(iri);
        }

        let retyped: BTreeSet<Iri> = applied
            .touched()
            .filter(|st| st.has_predicate(vocab::RDF_TYPE))
            .filter_map(|st| st.subject.as_iri().cloned())
            .collect();
        for iri in retyped {
            if let Some(entity) = self.registry.resolve(&iri) {
                if entity.is_individual() {
                    self.refresh_types(&entity);
                }
            }
        }

        debug!(
            removed = applied.removed.len(),
            added = applied.added.len(),
            "committed change set"
        );
        Ok(applied)
    }

    /// Re-derives the live type of an individual from its asserted classes.
    pub(crate) fn refresh_types(&mut self, individual: &Entity) -> Rebind {
        let mut types = self.asserted_classes(individual);
        if types.len() > 1 {
            types.retain(|t| !t.same(&self.thing));
        }
        self.fusion
            .rebind(individual.iri(), &types, &mut self.registry, &self.thing)
    }

    /// Every memoized fusion class.
    #[must_use]
    pub fn fusion_classes(&self) -> Vec<Entity> {
        self.fusion.fusion_classes()
    }

    /// Live type of every bound individual, ordered by individual.
    #[must_use]
    pub fn fusion_mappings(&self) -> Vec<(Iri, Entity)> {
        self.fusion.mappings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::annotation::AnnotationTarget;

    #[test]
    fn builtins_are_registered() {
        let world = World::new();
        assert!(world.thing().is_class());
        let comment = world.resolve_str(vocab::RDFS_COMMENT).unwrap();
        assert_eq!(comment.kind(), EntityKind::AnnotationProperty);
        assert!(world.resolve_str(vocab::ALIAS).is_some());
        assert_eq!(world.statement_count(), 0);
    }

    #[test]
    fn ontology_is_reused_by_iri() {
        let mut world = World::new();
        let a = world.ontology("http://test.org/a.owl").unwrap();
        let b = world.ontology("http://test.org/a.owl").unwrap();
        assert_eq!(a, b);
        assert_eq!(world.ontologies().len(), 1);
        assert!(world.get_ontology("http://test.org/a.owl").is_some());
        assert!(world.ontology("not an iri").is_err());
    }

    #[test]
    fn with_config_validates() {
        let mut config = WorldConfig::default();
        config.reasoner.timeout_ms = 0;
        assert!(World::with_config(config)
            .err()
            .is_some_and(|err| err.is_validation()));
    }

    #[test]
    fn raw_declaration_registers_entity() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/raw.owl").unwrap();
        let c = onto.entity_iri("C").unwrap();
        let added = world
            .add_statement(&onto, Statement::typed(c.clone(), vocab::iri(vocab::OWL_CLASS)))
            .unwrap();
        assert!(added);
        assert!(world.resolve(&c).unwrap().is_class());

        let err = world
            .add_statement(
                &onto,
                Statement::typed(c.clone(), vocab::iri(vocab::OWL_NAMED_INDIVIDUAL)),
            )
            .unwrap_err();
        assert!(err.is_kind_conflict());
        assert_eq!(world.statement_count(), 1);

        let literal = Statement::new(Node::from("x"), vocab::iri(vocab::RDFS_LABEL), Node::from("y"));
        assert!(world.add_statement(&onto, literal).unwrap_err().is_validation());

        let declaration = Statement::typed(c, vocab::iri(vocab::OWL_CLASS));
        assert!(world.remove_statement(&declaration).unwrap());
        assert!(!world.remove_statement(&declaration).unwrap());
    }

    #[test]
    fn destroy_ontology_drops_owned_entities() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/gone.owl").unwrap();
        let c = world.declare_class(&onto, "C", &[]).unwrap();
        let d = world.declare_class(&onto, "D", &[]).unwrap();
        let i = world.create_individual(&onto, Some("i"), &[&c, &d]).unwrap();
        let comment = world.resolve_str(vocab::RDFS_COMMENT).unwrap();
        world
            .add_annotation(&AnnotationTarget::entity(&c), &comment, "note")
            .unwrap();
        world
            .add_annotation(&AnnotationTarget::axiom(&i, vocab::RDF_TYPE, &d), &comment, "why")
            .unwrap();
        assert_eq!(world.fusion_classes().len(), 1);

        let removed = world.destroy_ontology(&onto).unwrap();
        assert!(removed > 0);
        assert_eq!(world.statement_count(), 0);
        assert!(world.resolve(c.iri()).is_none());
        assert!(world.resolve(i.iri()).is_none());
        assert!(world.fusion_classes().is_empty());
        assert!(world.get_ontology("http://test.org/gone.owl").is_none());
        assert!(world.destroy_ontology(&onto).unwrap_err().is_not_found());
    }

    #[test]
    fn removing_a_statement_drops_its_annotations() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/axiom.owl").unwrap();
        let c = world.declare_class(&onto, "C", &[]).unwrap();
        let i = world.create_individual(&onto, Some("i"), &[&c]).unwrap();
        let comment = world.resolve_str(vocab::RDFS_COMMENT).unwrap();
        let before = world.statement_count();

        let target = AnnotationTarget::axiom(&i, vocab::RDF_TYPE, &c);
        world.add_annotation(&target, &comment, "why").unwrap();
        assert_eq!(world.statement_count(), before + 5);

        assert!(world.remove_statement(&Statement::typed(i.iri().clone(), c.iri().clone())).unwrap());
        assert_eq!(world.statement_count(), before - 1);
        assert_eq!(world.annotation_count(&target), 0);
    }
}
