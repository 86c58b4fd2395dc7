//! Per-(individual, property) value view.

use std::fmt;

use crate::changeset::ChangeSet;
use crate::entity::Entity;
use crate::error::{OntoResult, ValidationError};
use crate::value::Node;
use crate::world::World;

/// A view over the values one individual has for one property.
///
/// Reads filter the statement store; every mutation is planned as a change
/// set (including the mirrored inverse statements) and committed at once, so
/// either both sides of an inverse pair change or neither does.
///
/// # Examples
///
/// ```
/// use ontosync::{PropertyOptions, World};
///
/// let mut world = World::new();
/// let onto = world.ontology("http://test.org/onto.owl").unwrap();
/// let obj = world.declare_class(&onto, "Obj", &[]).unwrap();
/// let prop = world.declare_object_property(&onto, "prop", PropertyOptions::default()).unwrap();
/// let o1 = world.create_individual(&onto, None, &[&obj]).unwrap();
/// let o2 = world.create_individual(&onto, None, &[&obj]).unwrap();
///
/// world.property(&o1, &prop).unwrap().append(&o2).unwrap();
/// assert_eq!(world.property(&o1, &prop).unwrap().values(), vec![o2.node()]);
/// ```
pub struct PropertyProxy<'w> {
    world: &'w mut World,
    subject: Entity,
    property: Entity,
}

impl fmt::Debug for PropertyProxy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyProxy")
            .field("subject", &self.subject)
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

impl<'w> PropertyProxy<'w> {
    pub(crate) fn new(world: &'w mut World, subject: Entity, property: Entity) -> Self {
        Self {
            world,
            subject,
            property,
        }
    }

    /// The entity whose values are viewed.
    #[must_use]
    pub fn subject(&self) -> &Entity {
        &self.subject
    }

    /// The viewed property.
    #[must_use]
    pub fn property(&self) -> &Entity {
        &self.property
    }

    /// Returns true if the property admits at most one value for this subject.
    #[must_use]
    pub fn is_functional(&self) -> bool {
        self.world
            .functional_for_individual(&self.subject, &self.property)
    }

    fn require_functional(&self) -> OntoResult<()> {
        if self.is_functional() {
            Ok(())
        } else {
            Err(ValidationError::NotFunctional {
                property: self.property.iri().clone(),
            }
            .into())
        }
    }

    /// Current values in assertion order.
    #[must_use]
    pub fn values(&self) -> Vec<Node> {
        self.world.values_of(&self.subject, &self.property)
    }

    /// Current values that are registered entities.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.values()
            .iter()
            .filter_map(Node::as_iri)
            .filter_map(|iri| self.world.resolve(iri))
            .collect()
    }

    /// Returns true if `value` is among the current values.
    #[must_use]
    pub fn contains(&self, value: impl Into<Node>) -> bool {
        let value = value.into();
        self.values().contains(&value)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    /// Returns true if the subject has no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// The single value of a functional property; `None` if absent.
    ///
    /// # Errors
    /// - `Validation(NotFunctional)`: the property is multi-valued for this subject
    pub fn get(&self) -> OntoResult<Option<Node>> {
        self.require_functional()?;
        Ok(self.values().into_iter().next())
    }

    /// Assigns a functional property, replacing any previous value.
    ///
    /// Inverse links of the old and new value are updated in the same commit.
    pub fn set(&mut self, value: impl Into<Node>) -> OntoResult<()> {
        self.require_functional()?;
        let mut cs = ChangeSet::new();
        self.world
            .plan_set(&self.subject, &self.property, Some(value.into()), &mut cs)?;
        self.world.commit(cs)?;
        Ok(())
    }

    /// Clears a functional property.
    pub fn unset(&mut self) -> OntoResult<()> {
        self.require_functional()?;
        let mut cs = ChangeSet::new();
        self.world
            .plan_set(&self.subject, &self.property, None, &mut cs)?;
        self.world.commit(cs)?;
        Ok(())
    }

    /// Adds a value. Appending a value already present is a no-op.
    ///
    /// # Errors
    /// - `CardinalityViolation`: the property (or its inverse) already holds
    ///   another value and admits only one
    pub fn append(&mut self, value: impl Into<Node>) -> OntoResult<()> {
        let mut cs = ChangeSet::new();
        self.world
            .plan_append(&self.subject, &self.property, value.into(), &mut cs)?;
        self.world.commit(cs)?;
        Ok(())
    }

    /// Removes a value; returns false if it was not present.
    pub fn remove(&mut self, value: impl Into<Node>) -> OntoResult<bool> {
        let value = value.into();
        let mut cs = ChangeSet::new();
        if !self
            .world
            .plan_remove(&self.subject, &self.property, &value, &mut cs)
        {
            return Ok(false);
        }
        self.world.commit(cs)?;
        Ok(true)
    }

    /// Removes every value, returning how many were removed.
    pub fn clear(&mut self) -> OntoResult<usize> {
        let values = self.values();
        let mut cs = ChangeSet::new();
        for value in &values {
            self.world
                .plan_remove(&self.subject, &self.property, value, &mut cs);
        }
        self.world.commit(cs)?;
        Ok(values.len())
    }
}
