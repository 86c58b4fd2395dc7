//! Property characteristics and value planning.
//!
//! Value mutations are planned into a [`ChangeSet`] before anything is
//! written: the plan includes the statement itself, the mirrored statement of
//! the inverse (or symmetric) property, and the removal of displaced values.

use crate::changeset::ChangeSet;
use crate::entity::{Entity, EntityKind};
use crate::error::{OntoError, OntoResult, ValidationError};
use crate::expr::Quantifier;
use crate::iri::Iri;
use crate::property::PropertyProxy;
use crate::statement::Statement;
use crate::value::Node;
use crate::vocab;

use super::World;

fn cardinality_violation(subject: &Entity, property: &Entity, reason: impl Into<String>) -> OntoError {
    OntoError::CardinalityViolation {
        subject: subject.iri().clone(),
        property: property.iri().clone(),
        reason: reason.into(),
    }
}

impl World {
    /// Value view of `property` on `subject`.
    ///
    /// # Errors
    /// - `Validation(WrongKind)`: `subject` is not an individual or
    ///   `property` is not an object or data property
    pub fn property(&mut self, subject: &Entity, property: &Entity) -> OntoResult<PropertyProxy<'_>> {
        if !subject.is_individual() {
            return Err(ValidationError::WrongKind {
                iri: subject.iri().clone(),
                expected: "individual",
                actual: subject.kind(),
            }
            .into());
        }
        if !matches!(
            property.kind(),
            EntityKind::ObjectProperty | EntityKind::DataProperty
        ) {
            return Err(ValidationError::WrongKind {
                iri: property.iri().clone(),
                expected: "object or data property",
                actual: property.kind(),
            }
            .into());
        }
        Ok(PropertyProxy::new(self, subject.clone(), property.clone()))
    }

    /// The property reachable under attribute name `name`.
    ///
    /// When several ontologies declare the same name, the one owned by
    /// `subject`'s ontology wins.
    #[must_use]
    pub fn accessor(&self, subject: &Entity, name: &str) -> Option<Entity> {
        let candidates: Vec<Entity> = self
            .accessors
            .lookup(name)
            .iter()
            .filter_map(|iri| self.registry.resolve(iri))
            .collect();
        candidates
            .iter()
            .find(|p| p.owner().is_some() && p.owner() == subject.owner())
            .or_else(|| candidates.first())
            .cloned()
    }

    /// Returns true if `name` resolves to a property for `subject`.
    #[must_use]
    pub fn has_attr(&self, subject: &Entity, name: &str) -> bool {
        self.accessor(subject, name).is_some()
    }

    /// Attribute-style access: `attr(o, "prop")` is `property(o, prop)`.
    ///
    /// # Errors
    /// - `NotFound`: no property has an accessor named `name`
    pub fn attr(&mut self, subject: &Entity, name: &str) -> OntoResult<PropertyProxy<'_>> {
        let property = self
            .accessor(subject, name)
            .ok_or_else(|| OntoError::not_found(format!("attribute {name}")))?;
        self.property(subject, &property)
    }

    fn has_characteristic(&self, property: &Entity, characteristic: &'static str) -> bool {
        self.statements.contains(&Statement::typed(
            property.node(),
            vocab::iri(characteristic),
        ))
    }

    /// Returns true if the property is declared functional.
    #[must_use]
    pub fn is_functional(&self, property: &Entity) -> bool {
        self.has_characteristic(property, vocab::OWL_FUNCTIONAL_PROPERTY)
    }

    /// Returns true if the property is declared inverse-functional.
    #[must_use]
    pub fn is_inverse_functional(&self, property: &Entity) -> bool {
        self.has_characteristic(property, vocab::OWL_INVERSE_FUNCTIONAL_PROPERTY)
    }

    /// Returns true if the property is declared transitive.
    #[must_use]
    pub fn is_transitive(&self, property: &Entity) -> bool {
        self.has_characteristic(property, vocab::OWL_TRANSITIVE_PROPERTY)
    }

    /// Returns true if the property is declared symmetric.
    #[must_use]
    pub fn is_symmetric(&self, property: &Entity) -> bool {
        self.has_characteristic(property, vocab::OWL_SYMMETRIC_PROPERTY)
    }

    /// The declared inverse of `property`, stated in either direction.
    #[must_use]
    pub fn inverse_of(&self, property: &Entity) -> Option<Entity> {
        let inverse_of = vocab::iri(vocab::OWL_INVERSE_OF);
        let node = property.node();
        let inverse = self
            .statements
            .find(Some(&node), Some(&inverse_of), None)
            .map(|st| &st.object)
            .chain(
                self.statements
                    .find(None, Some(&inverse_of), Some(&node))
                    .map(|st| &st.subject),
            )
            .filter_map(Node::as_iri)
            .find_map(|iri| self.registry.resolve(iri));
        inverse
    }

    /// Declares `inverse` as the inverse of `property`, replacing any previous pairing.
    pub fn set_inverse_of(&mut self, property: &Entity, inverse: &Entity) -> OntoResult<()> {
        for p in [property, inverse] {
            if p.kind() != EntityKind::ObjectProperty {
                return Err(ValidationError::WrongKind {
                    iri: p.iri().clone(),
                    expected: "object property",
                    actual: p.kind(),
                }
                .into());
            }
        }
        let inverse_of = vocab::iri(vocab::OWL_INVERSE_OF);
        let node = property.node();
        let mut cs = ChangeSet::new();
        cs.extend_removals(
            self.statements
                .find(Some(&node), Some(&inverse_of), None)
                .chain(self.statements.find(None, Some(&inverse_of), Some(&node)))
                .cloned()
                .collect::<Vec<_>>(),
        );
        cs.add(
            Statement::new(node, inverse_of, inverse.node()),
            self.owner_of(property),
        );
        self.commit(cs)?;
        Ok(())
    }

    /// The property whose statements mirror `property`'s: its inverse, or
    /// itself when symmetric.
    pub(crate) fn mirror_of(&self, property: &Entity) -> Option<Entity> {
        if property.kind() != EntityKind::ObjectProperty {
            return None;
        }
        self.inverse_of(property)
            .or_else(|| self.is_symmetric(property).then(|| property.clone()))
    }

    /// Classes in the declared domain of `property`.
    #[must_use]
    pub fn domain(&self, property: &Entity) -> Vec<Entity> {
        let domain = vocab::iri(vocab::RDFS_DOMAIN);
        let node = property.node();
        self.statements
            .find(Some(&node), Some(&domain), None)
            .filter_map(|st| st.object.as_iri())
            .filter_map(|iri| self.registry.resolve(iri))
            .collect()
    }

    /// Declared range: class identifiers or datatype identifiers.
    #[must_use]
    pub fn range(&self, property: &Entity) -> Vec<Iri> {
        let range = vocab::iri(vocab::RDFS_RANGE);
        let node = property.node();
        self.statements
            .find(Some(&node), Some(&range), None)
            .filter_map(|st| st.object.as_iri().cloned())
            .collect()
    }

    /// Returns true if `property` admits at most one value on instances of `class`.
    ///
    /// That is the case when the property is functional, or `class` (or a
    /// named ancestor) carries a `max`/`exactly` restriction of at most one
    /// on it.
    #[must_use]
    pub fn is_functional_for(&self, property: &Entity, class: &Entity) -> bool {
        if self.is_functional(property) {
            return true;
        }
        let mut lineage = vec![class.clone()];
        lineage.extend(self.ancestors(class));
        lineage.iter().filter(|c| !c.is_fusion()).any(|c| {
            let is_a = self.is_a(c).unwrap_or_default();
            let equivalent = self.equivalent_to(c).unwrap_or_default();
            is_a.iter().chain(equivalent.iter()).any(|expr| {
                expr.restrictions().iter().any(|(p, q, _)| {
                    p.same(property)
                        && matches!(q, Quantifier::Max(n) | Quantifier::Exactly(n) if *n <= 1)
                })
            })
        })
    }

    pub(crate) fn functional_for_individual(&self, individual: &Entity, property: &Entity) -> bool {
        self.is_functional(property)
            || self
                .asserted_classes(individual)
                .iter()
                .any(|class| self.is_functional_for(property, class))
    }

    /// Objects of `(subject, property, _)` in assertion order.
    pub(crate) fn values_of(&self, subject: &Entity, property: &Entity) -> Vec<Node> {
        let node = subject.node();
        self.statements
            .find(Some(&node), Some(property.iri()), None)
            .map(|st| st.object.clone())
            .collect()
    }

    fn check_value(&self, property: &Entity, value: &Node) -> OntoResult<()> {
        let invalid = |reason: String| -> OntoError {
            ValidationError::InvalidValue {
                property: property.iri().clone(),
                reason,
            }
            .into()
        };
        match property.kind() {
            EntityKind::ObjectProperty => {
                let target = value
                    .as_iri()
                    .and_then(|iri| self.registry.resolve(iri))
                    .ok_or_else(|| invalid(format!("{value} is not a known individual")))?;
                if target.is_individual() {
                    Ok(())
                } else {
                    Err(ValidationError::WrongKind {
                        iri: target.iri().clone(),
                        expected: "individual",
                        actual: target.kind(),
                    }
                    .into())
                }
            }
            EntityKind::DataProperty => {
                let literal = value
                    .as_literal()
                    .ok_or_else(|| invalid(format!("{value} is not a literal")))?;
                let range = self.range(property);
                let datatype = literal.value.datatype();
                let accepted = range.is_empty()
                    || range.iter().any(|r| {
                        r.as_str() == datatype
                            || (r.as_str() == vocab::XSD_DOUBLE && literal.value.is_int())
                    });
                if accepted {
                    Ok(())
                } else {
                    Err(invalid(format!("{value} is not in the declared range")))
                }
            }
            _ => Err(invalid("not an object or data property".to_string())),
        }
    }

    fn target_of(&self, property: &Entity, value: &Node) -> Option<(Entity, Entity)> {
        let mirror = self.mirror_of(property)?;
        let target = value.as_iri().and_then(|iri| self.registry.resolve(iri))?;
        Some((mirror, target))
    }

    /// Subjects other than `subject` already pointing at `value`.
    fn other_holders(&self, subject: &Entity, property: &Entity, value: &Node) -> Vec<Entity> {
        let node = subject.node();
        self.statements
            .find(None, Some(property.iri()), Some(value))
            .filter(|st| st.subject != node)
            .filter_map(|st| st.subject.as_iri())
            .filter_map(|iri| self.registry.resolve(iri))
            .collect()
    }

    /// Plans adding `value`; a value already present plans nothing.
    pub(crate) fn plan_append(
        &self,
        subject: &Entity,
        property: &Entity,
        value: Node,
        cs: &mut ChangeSet,
    ) -> OntoResult<()> {
        self.check_value(property, &value)?;
        let current = self.values_of(subject, property);
        if current.contains(&value) {
            return Ok(());
        }
        if !current.is_empty() && self.functional_for_individual(subject, property) {
            return Err(cardinality_violation(
                subject,
                property,
                "functional property already has a value; use set to replace it",
            ));
        }
        if self.is_inverse_functional(property)
            && !self.other_holders(subject, property, &value).is_empty()
        {
            return Err(cardinality_violation(
                subject,
                property,
                format!("inverse-functional property already points at {value}"),
            ));
        }

        let mirrored = self.target_of(property, &value);
        if let Some((mirror, target)) = &mirrored {
            let back = self.values_of(target, mirror);
            let own = subject.node();
            if back.iter().any(|v| *v != own) && self.functional_for_individual(target, mirror) {
                return Err(cardinality_violation(
                    target,
                    mirror,
                    "functional inverse already has a value",
                ));
            }
        }

        cs.add(
            Statement::new(subject.node(), property.iri().clone(), value),
            self.owner_of(subject),
        );
        if let Some((mirror, target)) = mirrored {
            cs.add(
                Statement::new(target.node(), mirror.iri().clone(), subject.node()),
                self.owner_of(&target),
            );
        }
        Ok(())
    }

    /// Plans removing `value` and its mirror; returns false if `value` is absent.
    pub(crate) fn plan_remove(
        &self,
        subject: &Entity,
        property: &Entity,
        value: &Node,
        cs: &mut ChangeSet,
    ) -> bool {
        let statement = Statement::new(subject.node(), property.iri().clone(), value.clone());
        if !self.statements.contains(&statement) {
            return false;
        }
        cs.remove(statement);
        if let Some((mirror, target)) = self.target_of(property, value) {
            cs.remove(Statement::new(
                target.node(),
                mirror.iri().clone(),
                subject.node(),
            ));
        }
        true
    }

    /// Plans replacing every value with `value` (`None` clears).
    ///
    /// Displaced links are removed in the same plan: the previous values and
    /// their mirrors, another holder of an inverse-functional value, and the
    /// previous value of a functional inverse.
    pub(crate) fn plan_set(
        &self,
        subject: &Entity,
        property: &Entity,
        value: Option<Node>,
        cs: &mut ChangeSet,
    ) -> OntoResult<()> {
        if let Some(value) = &value {
            self.check_value(property, value)?;
        }
        let current = self.values_of(subject, property);
        if let Some(value) = &value {
            if current.len() == 1 && current[0] == *value {
                return Ok(());
            }
        }
        for old in &current {
            self.plan_remove(subject, property, old, cs);
        }
        let Some(value) = value else {
            return Ok(());
        };

        if self.is_inverse_functional(property) {
            for holder in self.other_holders(subject, property, &value) {
                self.plan_remove(&holder, property, &value, cs);
            }
        }
        let mirrored = self.target_of(property, &value);
        if let Some((mirror, target)) = &mirrored {
            if self.functional_for_individual(target, mirror) {
                let own = subject.node();
                for back in self.values_of(target, mirror) {
                    if back != own {
                        self.plan_remove(target, mirror, &back, cs);
                    }
                }
            }
        }

        cs.add(
            Statement::new(subject.node(), property.iri().clone(), value),
            self.owner_of(subject),
        );
        if let Some((mirror, target)) = mirrored {
            cs.add(
                Statement::new(target.node(), mirror.iri().clone(), subject.node()),
                self.owner_of(&target),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::expr::ClassExpr;
    use crate::ontology::Ontology;
    use crate::world::PropertyOptions;

    struct Fixture {
        world: World,
        onto: Ontology,
        obj: Entity,
    }

    fn fixture() -> Fixture {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/v.owl").unwrap();
        let obj = world.declare_class(&onto, "Obj", &[]).unwrap();
        Fixture { world, onto, obj }
    }

    #[test]
    fn append_rejects_second_functional_value() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let prop = world
            .declare_object_property(&onto, "prop", PropertyOptions::new().functional())
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        let b = world.create_individual(&onto, None, &[&obj]).unwrap();
        let c = world.create_individual(&onto, None, &[&obj]).unwrap();

        world.property(&a, &prop).unwrap().append(&b).unwrap();
        let err = world.property(&a, &prop).unwrap().append(&c).unwrap_err();
        assert!(err.is_cardinality_violation());

        world.property(&a, &prop).unwrap().set(&c).unwrap();
        assert_eq!(world.property(&a, &prop).unwrap().get().unwrap(), Some(c.node()));
    }

    #[test]
    fn get_on_multi_valued_property_fails() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let prop = world
            .declare_object_property(&onto, "prop", PropertyOptions::new())
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        let err = world.property(&a, &prop).unwrap().get().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn restriction_makes_property_functional_for_class() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let prop = world
            .declare_object_property(&onto, "prop", PropertyOptions::new())
            .unwrap();
        let single = world
            .declare_class(&onto, "Single", &[ClassExpr::max(&prop, 1, &obj)])
            .unwrap();
        let child = world
            .declare_class(&onto, "Child", &[ClassExpr::from(&single)])
            .unwrap();
        assert!(world.is_functional_for(&prop, &single));
        assert!(world.is_functional_for(&prop, &child));
        assert!(!world.is_functional_for(&prop, &obj));
        assert!(!world.is_functional(&prop));

        let s = world.create_individual(&onto, None, &[&child]).unwrap();
        assert!(world.property(&s, &prop).unwrap().is_functional());
    }

    #[test]
    fn symmetric_property_mirrors_itself() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let near = world
            .declare_object_property(&onto, "near", PropertyOptions::new().symmetric())
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        let b = world.create_individual(&onto, None, &[&obj]).unwrap();

        world.property(&a, &near).unwrap().append(&b).unwrap();
        assert!(world.property(&b, &near).unwrap().contains(&a));
        assert!(world.property(&b, &near).unwrap().remove(&a).unwrap());
        assert!(world.property(&a, &near).unwrap().is_empty());
    }

    #[test]
    fn inverse_functional_append_and_set() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let owns = world
            .declare_object_property(
                &onto,
                "owns",
                PropertyOptions::new().functional().inverse_functional(),
            )
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        let b = world.create_individual(&onto, None, &[&obj]).unwrap();
        let thing = world.create_individual(&onto, None, &[&obj]).unwrap();

        world.property(&a, &owns).unwrap().append(&thing).unwrap();
        let err = world.property(&b, &owns).unwrap().append(&thing).unwrap_err();
        assert!(err.is_cardinality_violation());

        world.property(&b, &owns).unwrap().set(&thing).unwrap();
        assert!(world.property(&a, &owns).unwrap().is_empty());
        assert!(world.property(&b, &owns).unwrap().contains(&thing));
    }

    #[test]
    fn data_values_are_checked() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let price = world
            .declare_data_property(
                &onto,
                "price",
                PropertyOptions::new()
                    .functional()
                    .datatype(vocab::iri(vocab::XSD_DOUBLE)),
            )
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        world.property(&a, &price).unwrap().set(9.5).unwrap();
        world.property(&a, &price).unwrap().set(10).unwrap();
        assert!(world.property(&a, &price).unwrap().set("cheap").is_err());
        assert!(world.property(&a, &price).unwrap().set(&obj).is_err());
        assert_eq!(
            world.property(&a, &price).unwrap().get().unwrap(),
            Some(Node::from(10))
        );
    }

    #[test]
    fn attribute_lookup_prefers_subject_ontology() {
        let Fixture {
            mut world,
            onto,
            obj,
        } = fixture();
        let other = world.ontology("http://test.org/other.owl").unwrap();
        let mine = world
            .declare_object_property(&onto, "rel", PropertyOptions::new())
            .unwrap();
        world
            .declare_object_property(&other, "rel", PropertyOptions::new())
            .unwrap();
        let a = world.create_individual(&onto, None, &[&obj]).unwrap();
        assert!(world.accessor(&a, "rel").unwrap().same(&mine));
        assert!(world.attr(&a, "missing").unwrap_err().is_not_found());
    }
}
