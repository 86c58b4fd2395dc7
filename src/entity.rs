//! Entity handles and kinds.
//!
//! An [`Entity`] is a live, shared handle to one identifier. The registry hands
//! out exactly one handle per identifier, so handle equality is reference
//! equality: fusion-class memoization and inverse mirroring rely on it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::iri::Iri;
use crate::ontology::OntologyId;
use crate::value::Node;
use crate::vocab;

/// Classification of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A named class (or a synthetic fusion class)
    Class,
    /// A relation between individuals
    ObjectProperty,
    /// A relation from individuals to literals
    DataProperty,
    /// Metadata attached to entities and statements
    AnnotationProperty,
    /// A member of classes
    Individual,
}

impl EntityKind {
    /// The `rdf:type` object that declares an entity of this kind.
    #[must_use]
    pub const fn declaration(&self) -> &'static str {
        match self {
            Self::Class => vocab::OWL_CLASS,
            Self::ObjectProperty => vocab::OWL_OBJECT_PROPERTY,
            Self::DataProperty => vocab::OWL_DATATYPE_PROPERTY,
            Self::AnnotationProperty => vocab::OWL_ANNOTATION_PROPERTY,
            Self::Individual => vocab::OWL_NAMED_INDIVIDUAL,
        }
    }

    /// Inverse of [`EntityKind::declaration`].
    #[must_use]
    pub fn from_declaration(iri: &str) -> Option<Self> {
        match iri {
            vocab::OWL_CLASS => Some(Self::Class),
            vocab::OWL_OBJECT_PROPERTY => Some(Self::ObjectProperty),
            vocab::OWL_DATATYPE_PROPERTY => Some(Self::DataProperty),
            vocab::OWL_ANNOTATION_PROPERTY => Some(Self::AnnotationProperty),
            vocab::OWL_NAMED_INDIVIDUAL => Some(Self::Individual),
            _ => None,
        }
    }

    /// Returns true for the three property kinds.
    #[must_use]
    pub const fn is_property(&self) -> bool {
        matches!(
            self,
            Self::ObjectProperty | Self::DataProperty | Self::AnnotationProperty
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::ObjectProperty => write!(f, "object property"),
            Self::DataProperty => write!(f, "data property"),
            Self::AnnotationProperty => write!(f, "annotation property"),
            Self::Individual => write!(f, "individual"),
        }
    }
}

#[derive(Debug)]
struct EntityRecord {
    iri: Iri,
    kind: EntityKind,
    owner: Option<OntologyId>,
    fusion_of: Option<Vec<Entity>>,
}

/// Shared handle to a registered entity.
///
/// # Examples
///
/// ```
/// use ontosync::{EntityKind, World};
///
/// let mut world = World::new();
/// let onto = world.ontology("http://test.org/onto.owl").unwrap();
/// let a = world.declare_class(&onto, "Pizza", &[]).unwrap();
/// let b = world.resolve(a.iri()).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.kind(), EntityKind::Class);
/// ```
#[derive(Clone)]
pub struct Entity(Arc<EntityRecord>);

impl Entity {
    pub(crate) fn new(iri: Iri, kind: EntityKind, owner: Option<OntologyId>) -> Self {
        Self(Arc::new(EntityRecord {
            iri,
            kind,
            owner,
            fusion_of: None,
        }))
    }

    pub(crate) fn fusion(iri: Iri, bases: Vec<Entity>) -> Self {
        Self(Arc::new(EntityRecord {
            iri,
            kind: EntityKind::Class,
            owner: None,
            fusion_of: Some(bases),
        }))
    }

    /// The identifier.
    #[must_use]
    pub fn iri(&self) -> &Iri {
        &self.0.iri
    }

    /// The declared kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.0.kind
    }

    /// The ontology that first declared this entity. Fusion classes have none.
    #[must_use]
    pub fn owner(&self) -> Option<OntologyId> {
        self.0.owner
    }

    /// The local name of the identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.iri.local_name()
    }

    /// Returns true for named and fusion classes.
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.0.kind == EntityKind::Class
    }

    /// Returns true for named individuals.
    #[must_use]
    pub fn is_individual(&self) -> bool {
        self.0.kind == EntityKind::Individual
    }

    /// Returns true for object, data and annotation properties.
    #[must_use]
    pub fn is_property(&self) -> bool {
        self.0.kind.is_property()
    }

    /// Returns true for synthetic fusion classes.
    #[must_use]
    pub fn is_fusion(&self) -> bool {
        self.0.fusion_of.is_some()
    }

    /// The base classes of a fusion class, in canonical order.
    #[must_use]
    pub fn fusion_bases(&self) -> Option<&[Entity]> {
        self.0.fusion_of.as_deref()
    }

    /// Returns this entity as a statement term.
    #[must_use]
    pub fn node(&self) -> Node {
        Node::Iri(self.0.iri.clone())
    }

    /// Reference equality.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.iri.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.fusion_of {
            Some(bases) => {
                let names: Vec<&str> = bases.iter().map(Entity::name).collect();
                write!(f, "Fusion({})", names.join(" & "))
            }
            None => write!(f, "{}({})", self.0.kind, self.0.iri.local_name()),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iri)
    }
}

impl From<&Entity> for Node {
    fn from(entity: &Entity) -> Self {
        entity.node()
    }
}

impl From<Entity> for Node {
    fn from(entity: Entity) -> Self {
        entity.node()
    }
}
