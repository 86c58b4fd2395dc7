//! Annotations, read from the statement store.
//!
//! An entity annotation is the statement `entity property value`. A statement
//! annotation hangs off an `owl:Axiom` node naming the annotated statement
//! through `owl:annotatedSource`, `owl:annotatedProperty` and
//! `owl:annotatedTarget`. Nothing is kept outside the store: values of one
//! (property, language) key are ordered by insertion, and the number of keys
//! holding a value is the annotation count of a target.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::iri::Iri;
use crate::registry::EntityRegistry;
use crate::statement::Statement;
use crate::storage::StatementStore;
use crate::value::{LangTag, Node};
use crate::vocab;

/// What an annotation is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum AnnotationTarget {
    /// A single entity.
    Entity {
        /// The annotated entity.
        iri: Iri,
    },
    /// An asserted statement.
    Statement {
        /// Subject of the annotated statement.
        subject: Iri,
        /// Predicate of the annotated statement.
        predicate: Iri,
        /// Object of the annotated statement.
        object: Node,
    },
}

impl AnnotationTarget {
    /// A target for `entity` itself.
    #[must_use]
    pub fn entity(entity: &Entity) -> Self {
        Self::Entity {
            iri: entity.iri().clone(),
        }
    }

    /// A target for the statement `subject predicate object`.
    #[must_use]
    pub fn statement(subject: &Entity, predicate: &Entity, object: impl Into<Node>) -> Self {
        Self::Statement {
            subject: subject.iri().clone(),
            predicate: predicate.iri().clone(),
            object: object.into(),
        }
    }

    /// A target for an axiom statement such as `subject rdfs:subClassOf object`.
    #[must_use]
    pub fn axiom(subject: &Entity, predicate: &'static str, object: impl Into<Node>) -> Self {
        Self::Statement {
            subject: subject.iri().clone(),
            predicate: vocab::iri(predicate),
            object: object.into(),
        }
    }

    /// The entity the target is rooted at.
    #[must_use]
    pub fn subject(&self) -> &Iri {
        match self {
            Self::Entity { iri } => iri,
            Self::Statement { subject, .. } => subject,
        }
    }

    /// The annotated statement, for statement targets.
    #[must_use]
    pub fn as_statement(&self) -> Option<Statement> {
        match self {
            Self::Entity { .. } => None,
            Self::Statement {
                subject,
                predicate,
                object,
            } => Some(Statement::new(subject.clone(), predicate.clone(), object.clone())),
        }
    }
}

impl From<&Entity> for AnnotationTarget {
    fn from(entity: &Entity) -> Self {
        Self::entity(entity)
    }
}

/// (annotation property, language) slice key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationKey {
    /// The annotation property.
    pub property: Iri,
    /// Language of the slice; `None` for untagged values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LangTag>,
}

impl AnnotationKey {
    /// A key for `property` in `lang`.
    #[must_use]
    pub fn new(property: Iri, lang: Option<LangTag>) -> Self {
        Self { property, lang }
    }

    /// The key a value is filed under: its literal language, if any.
    #[must_use]
    pub fn for_value(property: &Iri, value: &Node) -> Self {
        Self {
            property: property.clone(),
            lang: lang_of(value).cloned(),
        }
    }

    /// Returns true if `statement` holds a value of this key.
    #[must_use]
    pub fn matches(&self, statement: &Statement) -> bool {
        statement.predicate == self.property && lang_of(&statement.object) == self.lang.as_ref()
    }
}

fn lang_of(value: &Node) -> Option<&LangTag> {
    value.as_literal().and_then(|lit| lit.lang.as_ref())
}

/// Axiom nodes annotating `statement`.
pub(crate) fn axioms_of(store: &dyn StatementStore, statement: &Statement) -> Vec<Node> {
    let source = vocab::iri(vocab::OWL_ANNOTATED_SOURCE);
    let property = vocab::iri(vocab::OWL_ANNOTATED_PROPERTY);
    let target = vocab::iri(vocab::OWL_ANNOTATED_TARGET);
    let predicate = Node::Iri(statement.predicate.clone());
    let axioms: Vec<Node> = store
        .find(None, Some(&source), Some(&statement.subject))
        .map(|st| st.subject.clone())
        .filter(|node| {
            store.contains(&Statement::new(node.clone(), property.clone(), predicate.clone()))
                && store.contains(&Statement::new(
                    node.clone(),
                    target.clone(),
                    statement.object.clone(),
                ))
        })
        .collect();
    axioms
}

/// The statements declaring `node` as the axiom node of `statement`.
pub(crate) fn axiom_skeleton(node: &Node, statement: &Statement) -> [Statement; 4] {
    [
        Statement::typed(node.clone(), vocab::iri(vocab::OWL_AXIOM)),
        Statement::new(
            node.clone(),
            vocab::iri(vocab::OWL_ANNOTATED_SOURCE),
            statement.subject.clone(),
        ),
        Statement::new(
            node.clone(),
            vocab::iri(vocab::OWL_ANNOTATED_PROPERTY),
            statement.predicate.clone(),
        ),
        Statement::new(
            node.clone(),
            vocab::iri(vocab::OWL_ANNOTATED_TARGET),
            statement.object.clone(),
        ),
    ]
}

struct Slot {
    key: AnnotationKey,
    values: Vec<Node>,
}

/// Read view over the annotations held in a statement store.
///
/// A statement is an annotation when its predicate is a registered
/// annotation property. Shorthand names resolve through display names: a
/// property answers to a name if its display name, or the display name of any
/// of its transitive `rdfs:subPropertyOf` parents, equals the name.
pub(crate) struct AnnotationIndex<'a> {
    statements: &'a dyn StatementStore,
    registry: &'a EntityRegistry,
}

impl<'a> AnnotationIndex<'a> {
    pub(crate) fn new(statements: &'a dyn StatementStore, registry: &'a EntityRegistry) -> Self {
        Self {
            statements,
            registry,
        }
    }

    fn is_annotation(&self, statement: &Statement) -> bool {
        self.registry
            .resolve(&statement.predicate)
            .is_some_and(|e| e.kind() == EntityKind::AnnotationProperty)
    }

    /// Nodes the values of `target` hang off: the entity itself, or every
    /// axiom node of the annotated statement.
    pub(crate) fn carriers(&self, target: &AnnotationTarget) -> Vec<Node> {
        match target.as_statement() {
            None => vec![Node::Iri(target.subject().clone())],
            Some(statement) => axioms_of(self.statements, &statement),
        }
    }

    /// Annotation statements of `target`, in insertion order.
    pub(crate) fn statements(&self, target: &AnnotationTarget) -> Vec<Statement> {
        let carriers = self.carriers(target);
        let mut out: Vec<Statement> = Vec::new();
        for carrier in &carriers {
            out.extend(
                self.statements
                    .find(Some(carrier), None, None)
                    .filter(|st| self.is_annotation(st))
                    .cloned(),
            );
        }
        out
    }

    fn slots(&self, target: &AnnotationTarget) -> Vec<Slot> {
        let mut slots: Vec<Slot> = Vec::new();
        for st in self.statements(target) {
            let key = AnnotationKey::for_value(&st.predicate, &st.object);
            match slots.iter_mut().find(|slot| slot.key == key) {
                Some(slot) => slot.values.push(st.object),
                None => slots.push(Slot {
                    key,
                    values: vec![st.object],
                }),
            }
        }
        slots
    }

    /// Values of one exact (property, language) slice.
    pub(crate) fn slice(&self, target: &AnnotationTarget, key: &AnnotationKey) -> Vec<Node> {
        self.statements(target)
            .into_iter()
            .filter(|st| key.matches(st))
            .map(|st| st.object)
            .collect()
    }

    /// Values of `property`; without a language, every language variant in key order.
    pub(crate) fn get(&self, target: &AnnotationTarget, property: &Iri, lang: Option<&LangTag>) -> Vec<Node> {
        self.slots(target)
            .into_iter()
            .filter(|s| &s.key.property == property)
            .filter(|s| lang.map_or(true, |l| s.key.lang.as_ref() == Some(l)))
            .flat_map(|s| s.values)
            .collect()
    }

    /// Number of distinct (property, language) keys holding at least one value.
    pub(crate) fn len(&self, target: &AnnotationTarget) -> usize {
        self.slots(target).len()
    }

    /// Keys of a target, in the order they were first filled.
    pub(crate) fn keys(&self, target: &AnnotationTarget) -> Vec<AnnotationKey> {
        self.slots(target).into_iter().map(|s| s.key).collect()
    }

    fn display_name(&self, iri: &Iri) -> String {
        match self.registry.resolve(iri) {
            Some(entity) => self.registry.display_name(&entity).to_string(),
            None => iri.local_name().to_string(),
        }
    }

    pub(crate) fn answers_to(&self, property: &Iri, name: &str) -> bool {
        let sub_property_of = vocab::iri(vocab::RDFS_SUBPROPERTY_OF);
        let mut seen: HashSet<Iri> = HashSet::new();
        let mut queue: VecDeque<Iri> = VecDeque::from([property.clone()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if self.display_name(&current) == name {
                return true;
            }
            let subject = Node::Iri(current);
            for st in self.statements.find(Some(&subject), Some(&sub_property_of), None) {
                if let Some(parent) = st.object.as_iri() {
                    queue.push_back(parent.clone());
                }
            }
        }
        false
    }

    /// Properties used on `target` that answer to `name`.
    pub(crate) fn properties_named(&self, target: &AnnotationTarget, name: &str) -> HashSet<Iri> {
        self.keys(target)
            .into_iter()
            .map(|key| key.property)
            .filter(|property| self.answers_to(property, name))
            .collect()
    }

    /// The annotation property whose own display name is `name`.
    pub(crate) fn property_named(&self, name: &str) -> Option<Entity> {
        self.registry
            .find_by_name(name)
            .into_iter()
            .find(|e| e.kind() == EntityKind::AnnotationProperty)
    }

    /// Shorthand read: every slice whose property answers to `name`.
    pub(crate) fn get_by_name(&self, target: &AnnotationTarget, name: &str, lang: Option<&LangTag>) -> Vec<Node> {
        self.slots(target)
            .into_iter()
            .filter(|s| lang.map_or(true, |l| s.key.lang.as_ref() == Some(l)))
            .filter(|s| self.answers_to(&s.key.property, name))
            .flat_map(|s| s.values)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ontology::OntologyId;
    use crate::storage::InMemoryStatementStore;
    use crate::value::Literal;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    fn owner() -> OntologyId {
        OntologyId::for_iri(&iri("http://test.org/a"))
    }

    struct Fixture {
        statements: InMemoryStatementStore,
        registry: EntityRegistry,
        c: Node,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = EntityRegistry::new();
            for property in [vocab::RDFS_COMMENT, vocab::RDFS_LABEL] {
                registry
                    .get_or_create(&vocab::iri(property), EntityKind::AnnotationProperty, owner())
                    .unwrap();
            }
            Self {
                statements: InMemoryStatementStore::new(),
                registry,
                c: Node::Iri(iri("http://test.org/a#C")),
            }
        }

        fn add(&mut self, subject: &Node, property: &'static str, value: Node) {
            self.statements
                .add(Statement::new(subject.clone(), vocab::iri(property), value), owner())
                .unwrap();
        }

        fn index(&self) -> AnnotationIndex<'_> {
            AnnotationIndex::new(&self.statements, &self.registry)
        }
    }

    fn fr(text: &str) -> Node {
        Node::from(Literal::tagged(text, "fr").unwrap())
    }

    fn entity_target() -> AnnotationTarget {
        AnnotationTarget::Entity {
            iri: iri("http://test.org/a#C"),
        }
    }

    #[test]
    fn count_is_distinct_keys_not_values() {
        let mut f = Fixture::new();
        let c = f.c.clone();
        f.add(&c, vocab::RDFS_COMMENT, Node::from("a"));
        f.add(&c, vocab::RDFS_COMMENT, Node::from("b"));
        f.add(&c, vocab::RDFS_COMMENT, fr("c"));
        f.add(&c, vocab::RDFS_LABEL, Node::from("l"));
        f.add(&c, vocab::RDF_TYPE, Node::Iri(vocab::iri(vocab::OWL_CLASS)));

        let index = f.index();
        let t = entity_target();
        let comment = vocab::iri(vocab::RDFS_COMMENT);
        assert_eq!(index.len(&t), 3);
        assert_eq!(index.get(&t, &comment, None), vec![Node::from("a"), Node::from("b"), fr("c")]);
        let lang = LangTag::parse("fr").unwrap();
        assert_eq!(index.get(&t, &comment, Some(&lang)), vec![fr("c")]);
        assert_eq!(
            index.slice(&t, &AnnotationKey::new(comment.clone(), None)),
            vec![Node::from("a"), Node::from("b")]
        );
        assert_eq!(index.keys(&t)[2], AnnotationKey::new(vocab::iri(vocab::RDFS_LABEL), None));
    }

    #[test]
    fn statement_values_hang_off_their_axiom_node() {
        let mut f = Fixture::new();
        let d = Node::Iri(iri("http://test.org/a#D"));
        let sub_class = Statement::new(d, vocab::iri(vocab::RDFS_SUBCLASS_OF), f.c.clone());
        f.statements.add(sub_class.clone(), owner()).unwrap();
        let target = AnnotationTarget::Statement {
            subject: iri("http://test.org/a#D"),
            predicate: vocab::iri(vocab::RDFS_SUBCLASS_OF),
            object: f.c.clone(),
        };
        assert!(f.index().carriers(&target).is_empty());

        let axiom = Node::blank();
        for st in axiom_skeleton(&axiom, &sub_class) {
            f.statements.add(st, owner()).unwrap();
        }
        f.add(&axiom, vocab::RDFS_COMMENT, Node::from("annot"));

        assert_eq!(axioms_of(&f.statements, &sub_class), vec![axiom.clone()]);
        let index = f.index();
        assert_eq!(index.carriers(&target), vec![axiom]);
        assert_eq!(index.get(&target, &vocab::iri(vocab::RDFS_COMMENT), None), vec![Node::from("annot")]);
        assert_eq!(index.len(&target), 1);
        assert_eq!(index.len(&entity_target()), 0);
    }

    #[test]
    fn shorthand_aggregates_sub_properties() {
        let mut f = Fixture::new();
        let comment = vocab::iri(vocab::RDFS_COMMENT);
        let comment2 = iri("http://test.org/a#comment2");
        f.registry
            .get_or_create(&comment2, EntityKind::AnnotationProperty, owner())
            .unwrap();
        f.statements
            .add(
                Statement::new(comment2.clone(), vocab::iri(vocab::RDFS_SUBPROPERTY_OF), comment.clone()),
                owner(),
            )
            .unwrap();
        let c = f.c.clone();
        f.add(&c, vocab::RDFS_COMMENT, Node::from("1"));
        f.statements
            .add(Statement::new(c, comment2.clone(), Node::from("2")), owner())
            .unwrap();

        let index = f.index();
        let t = entity_target();
        assert_eq!(index.get_by_name(&t, "comment", None), vec![Node::from("1"), Node::from("2")]);
        assert_eq!(index.get_by_name(&t, "comment2", None), vec![Node::from("2")]);
        assert_eq!(index.properties_named(&t, "comment").len(), 2);
        assert!(index.property_named("comment2").is_some());
        assert!(index.property_named("absent").is_none());
    }

    #[test]
    fn key_matches_by_language() {
        let comment = vocab::iri(vocab::RDFS_COMMENT);
        let st = Statement::new(iri("http://test.org/a#C"), comment.clone(), fr("x"));
        assert!(AnnotationKey::for_value(&comment, &fr("y")).matches(&st));
        assert!(!AnnotationKey::new(comment, None).matches(&st));
    }
}
