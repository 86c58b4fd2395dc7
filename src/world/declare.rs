//! Entity declarations.

use tracing::debug;

use crate::changeset::ChangeSet;
use crate::entity::{Entity, EntityKind};
use crate::error::{OntoResult, ValidationError};
use crate::expr::ClassExpr;
use crate::iri::Iri;
use crate::ontology::Ontology;
use crate::statement::Statement;
use crate::vocab;

use super::World;

/// Characteristics of a declared object or data property.
///
/// # Examples
///
/// ```
/// use ontosync::{PropertyOptions, World};
///
/// let mut world = World::new();
/// let onto = world.ontology("http://test.org/onto.owl").unwrap();
/// let obj = world.declare_class(&onto, "Obj", &[]).unwrap();
/// let prop = world
///     .declare_object_property(&onto, "prop", PropertyOptions::new().functional().domain(&obj).range(&obj))
///     .unwrap();
/// assert!(world.is_functional(&prop));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyOptions {
    /// At most one value per subject.
    pub functional: bool,
    /// At most one subject per value.
    pub inverse_functional: bool,
    /// `p(a, b)` and `p(b, c)` entail `p(a, c)`.
    pub transitive: bool,
    /// `p(a, b)` entails `p(b, a)`.
    pub symmetric: bool,
    /// Property whose values are mirrored.
    pub inverse_of: Option<Entity>,
    /// Classes every subject belongs to.
    pub domain: Vec<Entity>,
    /// Classes for object properties, datatype identifiers for data properties.
    pub range: Vec<Iri>,
}

impl PropertyOptions {
    /// No characteristics, no domain or range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the property functional.
    #[must_use]
    pub fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    /// Marks the property inverse-functional.
    #[must_use]
    pub fn inverse_functional(mut self) -> Self {
        self.inverse_functional = true;
        self
    }

    /// Marks the property transitive.
    #[must_use]
    pub fn transitive(mut self) -> Self {
        self.transitive = true;
        self
    }

    /// Marks the property symmetric.
    #[must_use]
    pub fn symmetric(mut self) -> Self {
        self.symmetric = true;
        self
    }

    /// Declares `property` as the inverse.
    #[must_use]
    pub fn inverse_of(mut self, property: &Entity) -> Self {
        self.inverse_of = Some(property.clone());
        self
    }

    /// Adds a domain class.
    #[must_use]
    pub fn domain(mut self, class: &Entity) -> Self {
        self.domain.push(class.clone());
        self
    }

    /// Adds a range class or datatype.
    #[must_use]
    pub fn range(mut self, class: &Entity) -> Self {
        self.range.push(class.iri().clone());
        self
    }

    /// Adds a datatype range, e.g. `xsd:integer`.
    #[must_use]
    pub fn datatype(mut self, datatype: Iri) -> Self {
        self.range.push(datatype);
        self
    }
}

fn expect_kind(entity: &Entity, kind: EntityKind, expected: &'static str) -> Result<(), ValidationError> {
    if entity.kind() == kind {
        Ok(())
    } else {
        Err(ValidationError::WrongKind {
            iri: entity.iri().clone(),
            expected,
            actual: entity.kind(),
        })
    }
}

impl World {
    /// Registers `name` in `onto` as an entity of `kind` and writes its declaration.
    pub(crate) fn declare_entity(
        &mut self,
        onto: &Ontology,
        name: &str,
        kind: EntityKind,
    ) -> OntoResult<Entity> {
        self.require_live(onto)?;
        let iri = onto.entity_iri(name)?;
        let (entity, fresh) = self.registry.get_or_create(&iri, kind, onto.id())?;
        if fresh {
            if matches!(kind, EntityKind::ObjectProperty | EntityKind::DataProperty) {
                self.accessors.register(&entity, entity.name());
            }
            debug!(iri = %iri, kind = %kind, "declared entity");
        }

        let mut cs = ChangeSet::new();
        cs.add(
            Statement::typed(entity.node(), vocab::iri(kind.declaration())),
            onto.id(),
        );
        self.commit(cs)?;
        Ok(entity)
    }

    /// Declares a class with the given parents (named classes or expressions).
    ///
    /// # Errors
    /// - `KindConflict`: `name` is already declared as another kind
    /// - `Validation`: a parent expression is malformed
    pub fn declare_class(
        &mut self,
        onto: &Ontology,
        name: &str,
        parents: &[ClassExpr],
    ) -> OntoResult<Entity> {
        for parent in parents {
            parent.validate()?;
        }
        let class = self.declare_entity(onto, name, EntityKind::Class)?;
        for parent in parents {
            self.add_is_a(&class, parent.clone())?;
        }
        Ok(class)
    }

    fn check_property_options(
        &self,
        options: &PropertyOptions,
        kind: EntityKind,
        iri: &Iri,
    ) -> Result<(), ValidationError> {
        for class in &options.domain {
            expect_kind(class, EntityKind::Class, "class")?;
        }
        if let Some(inverse) = &options.inverse_of {
            expect_kind(inverse, EntityKind::ObjectProperty, "object property")?;
        }
        if kind == EntityKind::ObjectProperty {
            for range in &options.range {
                let class = self
                    .registry
                    .resolve(range)
                    .ok_or_else(|| ValidationError::InvalidValue {
                        property: iri.clone(),
                        reason: format!("range {range} is not a declared class"),
                    })?;
                expect_kind(&class, EntityKind::Class, "class")?;
            }
        } else if options.inverse_of.is_some()
            || options.inverse_functional
            || options.transitive
            || options.symmetric
        {
            return Err(ValidationError::InvalidValue {
                property: iri.clone(),
                reason: "data properties are only functional or not".to_string(),
            });
        }
        Ok(())
    }

    fn declare_property(
        &mut self,
        onto: &Ontology,
        name: &str,
        kind: EntityKind,
        options: PropertyOptions,
    ) -> OntoResult<Entity> {
        let iri = onto.entity_iri(name)?;
        self.check_property_options(&options, kind, &iri)?;
        let property = self.declare_entity(onto, name, kind)?;

        let owner = onto.id();
        let subject = property.node();
        let mut cs = ChangeSet::new();
        let flags = [
            (options.functional, vocab::OWL_FUNCTIONAL_PROPERTY),
            (options.inverse_functional, vocab::OWL_INVERSE_FUNCTIONAL_PROPERTY),
            (options.transitive, vocab::OWL_TRANSITIVE_PROPERTY),
            (options.symmetric, vocab::OWL_SYMMETRIC_PROPERTY),
        ];
        for (set, characteristic) in flags {
            if set {
                cs.add(
                    Statement::typed(subject.clone(), vocab::iri(characteristic)),
                    owner,
                );
            }
        }
        if let Some(inverse) = &options.inverse_of {
            cs.add(
                Statement::new(subject.clone(), vocab::iri(vocab::OWL_INVERSE_OF), inverse.node()),
                owner,
            );
        }
        for class in &options.domain {
            cs.add(
                Statement::new(subject.clone(), vocab::iri(vocab::RDFS_DOMAIN), class.node()),
                owner,
            );
        }
        for range in options.range {
            cs.add(
                Statement::new(subject.clone(), vocab::iri(vocab::RDFS_RANGE), range),
                owner,
            );
        }
        self.commit(cs)?;
        Ok(property)
    }

    /// Declares an object property.
    pub fn declare_object_property(
        &mut self,
        onto: &Ontology,
        name: &str,
        options: PropertyOptions,
    ) -> OntoResult<Entity> {
        self.declare_property(onto, name, EntityKind::ObjectProperty, options)
    }

    /// Declares a data property. Only `functional`, `domain` and `range` apply.
    pub fn declare_data_property(
        &mut self,
        onto: &Ontology,
        name: &str,
        options: PropertyOptions,
    ) -> OntoResult<Entity> {
        self.declare_property(onto, name, EntityKind::DataProperty, options)
    }

    /// Declares an annotation property, optionally as a kind of `parent`.
    pub fn declare_annotation_property(
        &mut self,
        onto: &Ontology,
        name: &str,
        parent: Option<&Entity>,
    ) -> OntoResult<Entity> {
        if let Some(parent) = parent {
            expect_kind(parent, EntityKind::AnnotationProperty, "annotation property")?;
        }
        let property = self.declare_entity(onto, name, EntityKind::AnnotationProperty)?;
        if let Some(parent) = parent {
            let mut cs = ChangeSet::new();
            cs.add(
                Statement::new(
                    property.node(),
                    vocab::iri(vocab::RDFS_SUBPROPERTY_OF),
                    parent.node(),
                ),
                onto.id(),
            );
            self.commit(cs)?;
        }
        Ok(property)
    }

    fn anonymous_name(&self, onto: &Ontology, class: Option<&Entity>) -> OntoResult<String> {
        let base = class.map_or("thing", Entity::name).to_lowercase();
        let mut n: u64 = 1;
        loop {
            let candidate = format!("{base}{n}");
            if self.registry.resolve(&onto.entity_iri(&candidate)?).is_none() {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Creates (or extends) an individual.
    ///
    /// Without a name the individual is called after its first class
    /// (`obj1`, `obj2`, ...). Fusion classes expand to their bases. Without
    /// classes the individual is typed `owl:Thing`.
    pub fn create_individual(
        &mut self,
        onto: &Ontology,
        name: Option<&str>,
        classes: &[&Entity],
    ) -> OntoResult<Entity> {
        let mut types: Vec<Entity> = Vec::with_capacity(classes.len());
        for class in classes {
            expect_kind(class, EntityKind::Class, "class")?;
            match class.fusion_bases() {
                Some(bases) => types.extend(bases.iter().cloned()),
                None => types.push((*class).clone()),
            }
        }
        let mut seen = Vec::with_capacity(types.len());
        types.retain(|t| {
            if seen.contains(t.iri()) {
                false
            } else {
                seen.push(t.iri().clone());
                true
            }
        });

        let name = match name {
            Some(name) => name.to_string(),
            None => self.anonymous_name(onto, types.first())?,
        };
        let individual = self.declare_entity(onto, &name, EntityKind::Individual)?;

        let mut cs = ChangeSet::new();
        if types.is_empty() && self.asserted_classes(&individual).is_empty() {
            types.push(self.thing.clone());
        }
        for class in &types {
            cs.add(Statement::typed(individual.node(), class.node()), onto.id());
        }
        self.commit(cs)?;
        Ok(individual)
    }
}
