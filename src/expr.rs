//! Class expressions.
//!
//! Restrictions and boolean constructors are anonymous: they are written to
//! the statement store as blank-node structures following the OWL RDF mapping
//! and decoded back on read.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::entity::{Entity, EntityKind};
use crate::error::ValidationError;
use crate::iri::Iri;
use crate::registry::EntityRegistry;
use crate::statement::Statement;
use crate::storage::StatementStore;
use crate::value::{Literal, Node, Value};
use crate::vocab;

/// Upper bound on list cells followed while decoding.
const MAX_LIST_CELLS: usize = 4096;

/// Restriction quantifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// At least one value in the filler.
    Some,
    /// All values in the filler.
    Only,
    /// Has the given value.
    Value,
    /// At least `n` values in the filler.
    Min(u32),
    /// At most `n` values in the filler.
    Max(u32),
    /// Exactly `n` values in the filler.
    Exactly(u32),
}

impl Quantifier {
    const fn takes_value(self) -> bool {
        matches!(self, Self::Value)
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Some => write!(f, "some"),
            Self::Only => write!(f, "only"),
            Self::Value => write!(f, "value"),
            Self::Min(n) => write!(f, "min {n}"),
            Self::Max(n) => write!(f, "max {n}"),
            Self::Exactly(n) => write!(f, "exactly {n}"),
        }
    }
}

/// What a restriction constrains values to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filler {
    /// Values must be instances of a class expression.
    Class(Box<ClassExpr>),
    /// Values must include this individual or literal.
    Value(Node),
}

impl fmt::Display for Filler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(expr) => write!(f, "{expr}"),
            Self::Value(node) => write!(f, "{node}"),
        }
    }
}

/// A class in expression position: a named class or an anonymous construct.
///
/// # Examples
///
/// ```
/// use ontosync::{ClassExpr, PropertyOptions, World};
///
/// let mut world = World::new();
/// let onto = world.ontology("http://test.org/pizza.owl").unwrap();
/// let meat = world.declare_class(&onto, "Viande", &[]).unwrap();
/// let fish = world.declare_class(&onto, "Poisson", &[]).unwrap();
/// let has = world.declare_object_property(&onto, "a_pour_ingredient", PropertyOptions::default()).unwrap();
///
/// let veggie = !ClassExpr::some(&has, &meat) & !ClassExpr::some(&has, &fish);
/// assert!(matches!(veggie, ClassExpr::And(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ClassExpr {
    /// A named class.
    Named(Entity),
    /// A property restriction.
    Restriction {
        /// The restricted property.
        property: Entity,
        /// How many values must match.
        quantifier: Quantifier,
        /// What the values must match.
        filler: Filler,
    },
    /// Intersection.
    And(Vec<ClassExpr>),
    /// Union.
    Or(Vec<ClassExpr>),
    /// Complement.
    Not(Box<ClassExpr>),
}

impl ClassExpr {
    fn restriction(property: &Entity, quantifier: Quantifier, filler: Filler) -> Self {
        Self::Restriction {
            property: property.clone(),
            quantifier,
            filler,
        }
    }

    /// `property some filler`.
    #[must_use]
    pub fn some(property: &Entity, filler: impl Into<ClassExpr>) -> Self {
        Self::restriction(property, Quantifier::Some, Filler::Class(Box::new(filler.into())))
    }

    /// `property only filler`.
    #[must_use]
    pub fn only(property: &Entity, filler: impl Into<ClassExpr>) -> Self {
        Self::restriction(property, Quantifier::Only, Filler::Class(Box::new(filler.into())))
    }

    /// `property value v`.
    #[must_use]
    pub fn value(property: &Entity, value: impl Into<Node>) -> Self {
        Self::restriction(property, Quantifier::Value, Filler::Value(value.into()))
    }

    /// `property min n filler`.
    #[must_use]
    pub fn min(property: &Entity, n: u32, filler: impl Into<ClassExpr>) -> Self {
        Self::restriction(property, Quantifier::Min(n), Filler::Class(Box::new(filler.into())))
    }

    /// `property max n filler`.
    #[must_use]
    pub fn max(property: &Entity, n: u32, filler: impl Into<ClassExpr>) -> Self {
        Self::restriction(property, Quantifier::Max(n), Filler::Class(Box::new(filler.into())))
    }

    /// `property exactly n filler`.
    #[must_use]
    pub fn exactly(property: &Entity, n: u32, filler: impl Into<ClassExpr>) -> Self {
        Self::restriction(
            property,
            Quantifier::Exactly(n),
            Filler::Class(Box::new(filler.into())),
        )
    }

    /// Returns the named class, if this is one.
    #[must_use]
    pub fn as_named(&self) -> Option<&Entity> {
        match self {
            Self::Named(entity) => Some(entity),
            _ => None,
        }
    }

    /// Checks kinds and quantifier/filler agreement.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Named(entity) => {
                if entity.kind() != EntityKind::Class {
                    return Err(ValidationError::WrongKind {
                        iri: entity.iri().clone(),
                        expected: "class",
                        actual: entity.kind(),
                    });
                }
                Ok(())
            }
            Self::Restriction {
                property,
                quantifier,
                filler,
            } => {
                if !matches!(
                    property.kind(),
                    EntityKind::ObjectProperty | EntityKind::DataProperty
                ) {
                    return Err(ValidationError::WrongKind {
                        iri: property.iri().clone(),
                        expected: "object or data property",
                        actual: property.kind(),
                    });
                }
                match (quantifier.takes_value(), filler) {
                    (true, Filler::Value(node)) => {
                        let ok = match property.kind() {
                            EntityKind::DataProperty => node.as_literal().is_some(),
                            _ => node.as_iri().is_some(),
                        };
                        if ok {
                            Ok(())
                        } else {
                            Err(ValidationError::MalformedExpression {
                                reason: format!("value {node} does not fit {property}"),
                            })
                        }
                    }
                    (false, Filler::Class(inner)) => inner.validate(),
                    _ => Err(ValidationError::MalformedExpression {
                        reason: format!("quantifier '{quantifier}' does not accept this filler"),
                    }),
                }
            }
            Self::And(items) | Self::Or(items) => {
                if items.is_empty() {
                    return Err(ValidationError::MalformedExpression {
                        reason: "empty boolean construct".to_string(),
                    });
                }
                items.iter().try_for_each(ClassExpr::validate)
            }
            Self::Not(inner) => inner.validate(),
        }
    }

    /// Restrictions appearing at the top level or inside conjunctions.
    pub fn restrictions(&self) -> Vec<(&Entity, Quantifier, &Filler)> {
        match self {
            Self::Restriction {
                property,
                quantifier,
                filler,
            } => vec![(property, *quantifier, filler)],
            Self::And(items) => items.iter().flat_map(ClassExpr::restrictions).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&Entity> for ClassExpr {
    fn from(entity: &Entity) -> Self {
        Self::Named(entity.clone())
    }
}

impl From<Entity> for ClassExpr {
    fn from(entity: Entity) -> Self {
        Self::Named(entity)
    }
}

impl BitAnd for ClassExpr {
    type Output = ClassExpr;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Self::And(mut items) => {
                items.push(rhs);
                Self::And(items)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for ClassExpr {
    type Output = ClassExpr;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Self::Or(mut items) => {
                items.push(rhs);
                Self::Or(items)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for ClassExpr {
    type Output = ClassExpr;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[ClassExpr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {sep} ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

impl fmt::Display for ClassExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(entity) => write!(f, "{}", entity.name()),
            Self::Restriction {
                property,
                quantifier,
                filler,
            } => write!(f, "({} {quantifier} {filler})", property.name()),
            Self::And(items) => join(f, items, "and"),
            Self::Or(items) => join(f, items, "or"),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

fn stmt(subject: &Node, predicate: &'static str, object: Node) -> Statement {
    Statement::new(subject.clone(), vocab::iri(predicate), object)
}

fn cardinality(n: u32) -> Node {
    Node::Literal(Literal::new(Value::Int(i64::from(n))))
}

/// Writes the statements describing `expr` into `out` and returns its node.
pub(crate) fn encode(expr: &ClassExpr, out: &mut Vec<Statement>) -> Node {
    match expr {
        ClassExpr::Named(entity) => entity.node(),
        ClassExpr::Restriction {
            property,
            quantifier,
            filler,
        } => {
            let node = Node::blank();
            out.push(stmt(&node, vocab::RDF_TYPE, vocab::iri(vocab::OWL_RESTRICTION).into()));
            out.push(stmt(&node, vocab::OWL_ON_PROPERTY, property.node()));
            let filler_node = match filler {
                Filler::Class(inner) => encode(inner, out),
                Filler::Value(value) => value.clone(),
            };
            match quantifier {
                Quantifier::Some => out.push(stmt(&node, vocab::OWL_SOME_VALUES_FROM, filler_node)),
                Quantifier::Only => out.push(stmt(&node, vocab::OWL_ALL_VALUES_FROM, filler_node)),
                Quantifier::Value => out.push(stmt(&node, vocab::OWL_HAS_VALUE, filler_node)),
                Quantifier::Min(n) => {
                    out.push(stmt(&node, vocab::OWL_MIN_QUALIFIED_CARDINALITY, cardinality(*n)));
                    out.push(stmt(&node, vocab::OWL_ON_CLASS, filler_node));
                }
                Quantifier::Max(n) => {
                    out.push(stmt(&node, vocab::OWL_MAX_QUALIFIED_CARDINALITY, cardinality(*n)));
                    out.push(stmt(&node, vocab::OWL_ON_CLASS, filler_node));
                }
                Quantifier::Exactly(n) => {
                    out.push(stmt(&node, vocab::OWL_QUALIFIED_CARDINALITY, cardinality(*n)));
                    out.push(stmt(&node, vocab::OWL_ON_CLASS, filler_node));
                }
            }
            node
        }
        ClassExpr::And(items) | ClassExpr::Or(items) => {
            let node = Node::blank();
            let predicate = if matches!(expr, ClassExpr::And(_)) {
                vocab::OWL_INTERSECTION_OF
            } else {
                vocab::OWL_UNION_OF
            };
            let members: Vec<Node> = items.iter().map(|item| encode(item, out)).collect();
            let list = encode_list(&members, out);
            out.push(stmt(&node, vocab::RDF_TYPE, vocab::iri(vocab::OWL_CLASS).into()));
            out.push(stmt(&node, predicate, list));
            node
        }
        ClassExpr::Not(inner) => {
            let node = Node::blank();
            let inner_node = encode(inner, out);
            out.push(stmt(&node, vocab::RDF_TYPE, vocab::iri(vocab::OWL_CLASS).into()));
            out.push(stmt(&node, vocab::OWL_COMPLEMENT_OF, inner_node));
            node
        }
    }
}

/// Encodes an `rdf:List` of `members`.
pub(crate) fn encode_list(members: &[Node], out: &mut Vec<Statement>) -> Node {
    let mut rest = Node::Iri(vocab::iri(vocab::RDF_NIL));
    for member in members.iter().rev() {
        let cell = Node::blank();
        out.push(stmt(&cell, vocab::RDF_FIRST, member.clone()));
        out.push(stmt(&cell, vocab::RDF_REST, rest));
        rest = cell;
    }
    rest
}

fn malformed(reason: impl Into<String>) -> ValidationError {
    ValidationError::MalformedExpression {
        reason: reason.into(),
    }
}

/// Decodes an `rdf:List` into its members.
pub(crate) fn decode_list(list: &Node, store: &dyn StatementStore) -> Result<Vec<Node>, ValidationError> {
    let first = vocab::iri(vocab::RDF_FIRST);
    let rest = vocab::iri(vocab::RDF_REST);
    let mut members = Vec::new();
    let mut cell = list.clone();
    for _ in 0..MAX_LIST_CELLS {
        if cell.as_iri().is_some_and(|iri| iri.as_str() == vocab::RDF_NIL) {
            return Ok(members);
        }
        let member = store
            .find(Some(&cell), Some(&first), None)
            .next()
            .map(|st| st.object.clone())
            .ok_or_else(|| malformed(format!("list cell {cell} has no rdf:first")))?;
        members.push(member);
        let next = store
            .find(Some(&cell), Some(&rest), None)
            .next()
            .map(|st| st.object.clone());
        cell = next.ok_or_else(|| malformed(format!("list cell {cell} has no rdf:rest")))?;
    }
    Err(malformed("rdf:List exceeds the cell limit"))
}

fn resolve_kind(
    registry: &EntityRegistry,
    node: &Node,
    accept: &[EntityKind],
) -> Result<Entity, ValidationError> {
    let iri: &Iri = node
        .as_iri()
        .ok_or_else(|| malformed(format!("expected an entity, found {node}")))?;
    let entity = registry
        .resolve(iri)
        .ok_or_else(|| malformed(format!("unknown entity {iri}")))?;
    if accept.contains(&entity.kind()) {
        Ok(entity)
    } else {
        Err(ValidationError::WrongKind {
            iri: iri.clone(),
            expected: "class expression component",
            actual: entity.kind(),
        })
    }
}

fn decode_cardinality(node: &Node) -> Result<u32, ValidationError> {
    node.as_literal()
        .and_then(|lit| lit.value.as_int())
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| malformed(format!("invalid cardinality {node}")))
}

/// Decodes the class expression rooted at `node`.
pub(crate) fn decode(
    node: &Node,
    store: &dyn StatementStore,
    registry: &EntityRegistry,
) -> Result<ClassExpr, ValidationError> {
    let Some(_) = node.as_blank() else {
        return resolve_kind(registry, node, &[EntityKind::Class]).map(ClassExpr::Named);
    };

    let props: HashMap<&str, &Node> = store
        .find(Some(node), None, None)
        .map(|st| (st.predicate.as_str(), &st.object))
        .collect();

    if let Some(property) = props.get(vocab::OWL_ON_PROPERTY) {
        let property = resolve_kind(
            registry,
            property,
            &[EntityKind::ObjectProperty, EntityKind::DataProperty],
        )?;
        let class_filler = |key: &str| -> Result<Filler, ValidationError> {
            let filler = props
                .get(key)
                .ok_or_else(|| malformed(format!("restriction on {property} lacks {key}")))?;
            Ok(Filler::Class(Box::new(decode(filler, store, registry)?)))
        };

        let (quantifier, filler) = if props.contains_key(vocab::OWL_SOME_VALUES_FROM) {
            (Quantifier::Some, class_filler(vocab::OWL_SOME_VALUES_FROM)?)
        } else if props.contains_key(vocab::OWL_ALL_VALUES_FROM) {
            (Quantifier::Only, class_filler(vocab::OWL_ALL_VALUES_FROM)?)
        } else if let Some(value) = props.get(vocab::OWL_HAS_VALUE) {
            (Quantifier::Value, Filler::Value((*value).clone()))
        } else if let Some(n) = props.get(vocab::OWL_MIN_QUALIFIED_CARDINALITY) {
            (Quantifier::Min(decode_cardinality(n)?), class_filler(vocab::OWL_ON_CLASS)?)
        } else if let Some(n) = props.get(vocab::OWL_MAX_QUALIFIED_CARDINALITY) {
            (Quantifier::Max(decode_cardinality(n)?), class_filler(vocab::OWL_ON_CLASS)?)
        } else if let Some(n) = props.get(vocab::OWL_QUALIFIED_CARDINALITY) {
            (Quantifier::Exactly(decode_cardinality(n)?), class_filler(vocab::OWL_ON_CLASS)?)
        } else {
            return Err(malformed(format!("restriction on {property} has no quantifier")));
        };
        return Ok(ClassExpr::Restriction {
            property,
            quantifier,
            filler,
        });
    }

    let decode_members = |list: &Node| -> Result<Vec<ClassExpr>, ValidationError> {
        decode_list(list, store)?
            .iter()
            .map(|member| decode(member, store, registry))
            .collect()
    };

    if let Some(list) = props.get(vocab::OWL_INTERSECTION_OF) {
        return Ok(ClassExpr::And(decode_members(list)?));
    }
    if let Some(list) = props.get(vocab::OWL_UNION_OF) {
        return Ok(ClassExpr::Or(decode_members(list)?));
    }
    if let Some(inner) = props.get(vocab::OWL_COMPLEMENT_OF) {
        return Ok(ClassExpr::Not(Box::new(decode(inner, store, registry)?)));
    }
    Err(malformed(format!("anonymous node {node} is not a class expression")))
}

/// Every statement of the anonymous structure rooted at `node`.
///
/// Named entities are leaves; only blank nodes are followed.
pub(crate) fn structure(node: &Node, store: &dyn StatementStore) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        if current.as_blank().is_none() || !seen.insert(current.clone()) {
            continue;
        }
        for st in store.find(Some(&current), None, None) {
            if st.object.as_blank().is_some() {
                stack.push(st.object.clone());
            }
            out.push(st.clone());
        }
    }
    out
}
