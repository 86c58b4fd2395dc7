//! `is_a` / `equivalent_to` lists, the named class hierarchy and
//! disjointness groups.

use std::collections::{HashSet, VecDeque};

use crate::changeset::ChangeSet;
use crate::entity::{Entity, EntityKind};
use crate::error::{OntoResult, ValidationError};
use crate::expr::{self, ClassExpr};
use crate::iri::Iri;
use crate::ontology::Ontology;
use crate::statement::Statement;
use crate::value::Node;
use crate::vocab;

use super::World;

fn wrong_kind(entity: &Entity, expected: &'static str) -> ValidationError {
    ValidationError::WrongKind {
        iri: entity.iri().clone(),
        expected,
        actual: entity.kind(),
    }
}

impl World {
    /// Named classes asserted through `rdf:type` on an individual, in assertion order.
    pub(crate) fn asserted_classes(&self, individual: &Entity) -> Vec<Entity> {
        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let subject = individual.node();
        self.statements
            .find(Some(&subject), Some(&rdf_type), None)
            .filter_map(|st| st.object.as_iri())
            .filter_map(|iri| self.registry.resolve(iri))
            .filter(Entity::is_class)
            .collect()
    }

    fn hierarchy_predicate(entity: &Entity) -> OntoResult<&'static str> {
        match entity.kind() {
            EntityKind::Class => Ok(vocab::RDFS_SUBCLASS_OF),
            EntityKind::Individual => Ok(vocab::RDF_TYPE),
            _ => Err(wrong_kind(entity, "class or individual").into()),
        }
    }

    /// Decoded objects of `(subject, predicate, _)` that are class expressions.
    fn axioms(&self, subject: &Entity, predicate: &'static str) -> OntoResult<Vec<(Node, ClassExpr)>> {
        let predicate = vocab::iri(predicate);
        let subject = subject.node();
        let mut out = Vec::new();
        for st in self.statements.find(Some(&subject), Some(&predicate), None) {
            let is_expression = match &st.object {
                Node::Blank(_) => true,
                Node::Iri(iri) => self.registry.resolve(iri).is_some_and(|e| e.is_class()),
                Node::Literal(_) => false,
            };
            if is_expression {
                let decoded = expr::decode(&st.object, self.statements.as_ref(), &self.registry)?;
                out.push((st.object.clone(), decoded));
            }
        }
        Ok(out)
    }

    /// The `is_a` list: superclasses of a class or asserted types of an individual.
    ///
    /// Never empty: an entity without parents reports `owl:Thing`. A fusion
    /// class reports its bases.
    pub fn is_a(&self, entity: &Entity) -> OntoResult<Vec<ClassExpr>> {
        if let Some(bases) = entity.fusion_bases() {
            return Ok(bases.iter().cloned().map(ClassExpr::Named).collect());
        }
        let predicate = Self::hierarchy_predicate(entity)?;
        let mut parents: Vec<ClassExpr> = self
            .axioms(entity, predicate)?
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        if parents.is_empty() {
            parents.push(ClassExpr::Named(self.thing.clone()));
        }
        Ok(parents)
    }

    fn add_axiom(
        &mut self,
        subject: &Entity,
        predicate: &'static str,
        parent: ClassExpr,
    ) -> OntoResult<bool> {
        if subject.is_fusion() {
            return Err(ValidationError::InvalidValue {
                property: vocab::iri(predicate),
                reason: format!("{subject:?} is derived and cannot be edited"),
            }
            .into());
        }
        parent.validate()?;
        if self
            .axioms(subject, predicate)?
            .iter()
            .any(|(_, existing)| *existing == parent)
        {
            return Ok(false);
        }

        let mut encoded = Vec::new();
        let object = expr::encode(&parent, &mut encoded);
        encoded.push(Statement::new(subject.node(), vocab::iri(predicate), object));

        let owner = self.owner_of(subject);
        let mut cs = ChangeSet::new();
        for st in encoded {
            cs.add(st, owner);
        }
        self.commit(cs)?;
        Ok(true)
    }

    fn remove_axiom(
        &mut self,
        subject: &Entity,
        predicate: &'static str,
        parent: &ClassExpr,
    ) -> OntoResult<bool> {
        let Some((node, _)) = self
            .axioms(subject, predicate)?
            .into_iter()
            .find(|(_, existing)| existing == parent)
        else {
            return Ok(false);
        };
        let mut cs = ChangeSet::new();
        cs.remove(Statement::new(subject.node(), vocab::iri(predicate), node.clone()));
        cs.extend_removals(expr::structure(&node, self.statements.as_ref()));
        self.commit(cs)?;
        Ok(true)
    }

    /// Appends to the `is_a` list; returns false if the expression was already there.
    ///
    /// For individuals this is an `rdf:type` assertion and re-derives the
    /// individual's fusion class.
    pub fn add_is_a(&mut self, entity: &Entity, parent: impl Into<ClassExpr>) -> OntoResult<bool> {
        let predicate = Self::hierarchy_predicate(entity)?;
        self.add_axiom(entity, predicate, parent.into())
    }

    /// Removes an expression from the `is_a` list together with its anonymous structure.
    pub fn remove_is_a(&mut self, entity: &Entity, parent: &ClassExpr) -> OntoResult<bool> {
        let predicate = Self::hierarchy_predicate(entity)?;
        self.remove_axiom(entity, predicate, parent)
    }

    /// Class expressions equivalent to `class`, stated in either direction.
    pub fn equivalent_to(&self, class: &Entity) -> OntoResult<Vec<ClassExpr>> {
        if !class.is_class() {
            return Err(wrong_kind(class, "class").into());
        }
        let mut out: Vec<ClassExpr> = self
            .axioms(class, vocab::OWL_EQUIVALENT_CLASS)?
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        let predicate = vocab::iri(vocab::OWL_EQUIVALENT_CLASS);
        let object = class.node();
        for st in self.statements.find(None, Some(&predicate), Some(&object)) {
            if let Some(other) = st.subject.as_iri().and_then(|iri| self.registry.resolve(iri)) {
                let named = ClassExpr::Named(other);
                if !out.contains(&named) {
                    out.push(named);
                }
            }
        }
        Ok(out)
    }

    /// Asserts `class owl:equivalentClass expr`.
    pub fn add_equivalent(&mut self, class: &Entity, expr: impl Into<ClassExpr>) -> OntoResult<bool> {
        if !class.is_class() {
            return Err(wrong_kind(class, "class").into());
        }
        self.add_axiom(class, vocab::OWL_EQUIVALENT_CLASS, expr.into())
    }

    /// Retracts an equivalence; the encoded expression is removed with it.
    pub fn remove_equivalent(&mut self, class: &Entity, expr: &ClassExpr) -> OntoResult<bool> {
        self.remove_axiom(class, vocab::OWL_EQUIVALENT_CLASS, expr)
    }

    /// The live type of an individual: one class, a fusion class, or `owl:Thing`.
    pub fn type_of(&self, individual: &Entity) -> OntoResult<Entity> {
        if !individual.is_individual() {
            return Err(wrong_kind(individual, "individual").into());
        }
        Ok(self
            .fusion
            .type_of(individual.iri())
            .unwrap_or_else(|| self.thing.clone()))
    }

    /// Named superclasses of `class` reachable through `rdfs:subClassOf`,
    /// named equivalences and conjunction members, nearest first.
    #[must_use]
    pub fn ancestors(&self, class: &Entity) -> Vec<Entity> {
        let subclass_of = vocab::iri(vocab::RDFS_SUBCLASS_OF);
        let equivalent = vocab::iri(vocab::OWL_EQUIVALENT_CLASS);
        let intersection = vocab::iri(vocab::OWL_INTERSECTION_OF);

        let mut seen: HashSet<Iri> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<Entity> = VecDeque::new();
        seen.insert(class.iri().clone());
        match class.fusion_bases() {
            Some(bases) => queue.extend(bases.iter().cloned()),
            None => queue.push_back(class.clone()),
        }

        while let Some(current) = queue.pop_front() {
            if seen.insert(current.iri().clone()) {
                out.push(current.clone());
            }
            let node = current.node();
            let mut parents: Vec<Node> = self
                .statements
                .find(Some(&node), Some(&subclass_of), None)
                .chain(self.statements.find(Some(&node), Some(&equivalent), None))
                .map(|st| st.object.clone())
                .collect();
            parents.extend(
                self.statements
                    .find(None, Some(&equivalent), Some(&node))
                    .map(|st| st.subject.clone()),
            );

            for parent in parents {
                let members = if parent.as_blank().is_some() {
                    self.statements
                        .find(Some(&parent), Some(&intersection), None)
                        .next()
                        .and_then(|st| expr::decode_list(&st.object, self.statements.as_ref()).ok())
                        .unwrap_or_default()
                } else {
                    vec![parent]
                };
                for member in members {
                    let Some(entity) = member.as_iri().and_then(|iri| self.registry.resolve(iri)) else {
                        continue;
                    };
                    if entity.is_class() && !seen.contains(entity.iri()) {
                        queue.push_back(entity);
                    }
                }
            }
        }
        out
    }

    /// Returns true if `sub` is `sup` or one of its named descendants.
    ///
    /// A fusion class is a subclass of each of its bases; a class is a
    /// subclass of a fusion class when it is a subclass of every base.
    #[must_use]
    pub fn is_subclass_of(&self, sub: &Entity, sup: &Entity) -> bool {
        if sub.same(sup) || sup.same(&self.thing) {
            return true;
        }
        if let Some(bases) = sup.fusion_bases() {
            return bases.iter().all(|base| self.is_subclass_of(sub, base));
        }
        self.ancestors(sub).iter().any(|a| a.same(sup))
    }

    /// Returns true if one of the individual's asserted classes is `class` or a descendant.
    #[must_use]
    pub fn is_instance_of(&self, individual: &Entity, class: &Entity) -> bool {
        if !individual.is_individual() {
            return false;
        }
        if let Some(bases) = class.fusion_bases() {
            return bases.iter().all(|base| self.is_instance_of(individual, base));
        }
        if class.same(&self.thing) {
            return true;
        }
        self.asserted_classes(individual)
            .iter()
            .any(|asserted| self.is_subclass_of(asserted, class))
    }

    /// Declared individuals that are instances of `class`, ordered by identifier.
    #[must_use]
    pub fn instances_of(&self, class: &Entity) -> Vec<Entity> {
        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let declaration = Node::Iri(vocab::iri(vocab::OWL_NAMED_INDIVIDUAL));
        let mut out: Vec<Entity> = self
            .statements
            .find(None, Some(&rdf_type), Some(&declaration))
            .filter_map(|st| st.subject.as_iri())
            .filter_map(|iri| self.registry.resolve(iri))
            .filter(|ind| self.is_instance_of(ind, class))
            .collect();
        out.sort_by(|a, b| a.iri().cmp(b.iri()));
        out.dedup_by(|a, b| a.same(b));
        out
    }

    /// Asserts that `classes` are pairwise disjoint.
    ///
    /// # Errors
    /// - `Validation(DisjointGroupTooSmall)`: fewer than two distinct classes
    /// - `Validation(WrongKind)`: a member is not a class
    pub fn add_disjoint(&mut self, onto: &Ontology, classes: &[&Entity]) -> OntoResult<()> {
        self.require_live(onto)?;
        let mut members: Vec<&Entity> = Vec::with_capacity(classes.len());
        for class in classes {
            if !class.is_class() || class.is_fusion() {
                return Err(wrong_kind(class, "class").into());
            }
            if !members.iter().any(|m| m.same(class)) {
                members.push(class);
            }
        }
        if members.len() < 2 {
            return Err(ValidationError::DisjointGroupTooSmall {
                size: members.len(),
            }
            .into());
        }

        let mut encoded = Vec::new();
        let nodes: Vec<Node> = members.iter().map(|m| m.node()).collect();
        let list = expr::encode_list(&nodes, &mut encoded);
        let group = Node::blank();
        encoded.push(Statement::typed(
            group.clone(),
            vocab::iri(vocab::OWL_ALL_DISJOINT_CLASSES),
        ));
        encoded.push(Statement::new(group, vocab::iri(vocab::OWL_MEMBERS), list));

        let mut cs = ChangeSet::new();
        for st in encoded {
            cs.add(st, onto.id());
        }
        self.commit(cs)?;
        Ok(())
    }

    /// Every disjointness group in the store.
    pub fn disjoint_groups(&self) -> OntoResult<Vec<Vec<Entity>>> {
        let rdf_type = vocab::iri(vocab::RDF_TYPE);
        let members = vocab::iri(vocab::OWL_MEMBERS);
        let marker = Node::Iri(vocab::iri(vocab::OWL_ALL_DISJOINT_CLASSES));
        let mut groups = Vec::new();
        for st in self.statements.find(None, Some(&rdf_type), Some(&marker)) {
            let Some(list) = self
                .statements
                .find(Some(&st.subject), Some(&members), None)
                .next()
            else {
                continue;
            };
            let group: Vec<Entity> = expr::decode_list(&list.object, self.statements.as_ref())?
                .iter()
                .filter_map(Node::as_iri)
                .filter_map(|iri| self.registry.resolve(iri))
                .collect();
            groups.push(group);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::world::PropertyOptions;

    fn setup() -> (World, Ontology) {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/t.owl").unwrap();
        (world, onto)
    }

    #[test]
    fn empty_is_a_reports_thing() {
        let (mut world, onto) = setup();
        let c = world.declare_class(&onto, "C", &[]).unwrap();
        assert_eq!(world.is_a(&c).unwrap(), vec![ClassExpr::Named(world.thing().clone())]);
    }

    #[test]
    fn add_is_a_is_idempotent() {
        let (mut world, onto) = setup();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        assert!(world.add_is_a(&b, &a).unwrap());
        let count = world.statement_count();
        assert!(!world.add_is_a(&b, &a).unwrap());
        assert_eq!(world.statement_count(), count);
        assert!(world.is_subclass_of(&b, &a));
        assert!(!world.is_subclass_of(&a, &b));
    }

    #[test]
    fn removing_restriction_removes_its_structure() {
        let (mut world, onto) = setup();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let p = world
            .declare_object_property(&onto, "p", PropertyOptions::new())
            .unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        let before = world.statement_count();

        let restriction = ClassExpr::some(&p, &a);
        world.add_is_a(&b, restriction.clone()).unwrap();
        assert!(world.statement_count() > before + 1);
        assert!(world.is_a(&b).unwrap().contains(&restriction));

        assert!(world.remove_is_a(&b, &restriction).unwrap());
        assert_eq!(world.statement_count(), before);
        assert!(!world.remove_is_a(&b, &restriction).unwrap());
    }

    #[test]
    fn ancestors_follow_equivalence_and_conjunction() {
        let (mut world, onto) = setup();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        let c = world.declare_class(&onto, "C", &[]).unwrap();
        let d = world.declare_class(&onto, "D", &[]).unwrap();
        world.add_is_a(&b, &a).unwrap();
        world.add_equivalent(&c, ClassExpr::from(&b) & ClassExpr::from(&d)).unwrap();

        let ancestors = world.ancestors(&c);
        assert!(ancestors.iter().any(|x| x.same(&a)));
        assert!(ancestors.iter().any(|x| x.same(&d)));
        assert!(world.is_subclass_of(&c, world.thing()));
        assert_eq!(world.equivalent_to(&c).unwrap().len(), 1);
    }

    #[test]
    fn instances_follow_hierarchy() {
        let (mut world, onto) = setup();
        let animal = world.declare_class(&onto, "Animal", &[]).unwrap();
        let dog = world
            .declare_class(&onto, "Dog", &[ClassExpr::from(&animal)])
            .unwrap();
        let rex = world.create_individual(&onto, Some("rex"), &[&dog]).unwrap();
        assert!(world.is_instance_of(&rex, &animal));
        assert_eq!(world.instances_of(&animal), vec![rex.clone()]);
        assert!(world.type_of(&rex).unwrap().same(&dog));
        assert!(world.type_of(&dog).is_err());
    }

    #[test]
    fn disjoint_groups_need_two_classes() {
        let (mut world, onto) = setup();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        let err = world.add_disjoint(&onto, &[&a, &a]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::OntoError::Validation(ValidationError::DisjointGroupTooSmall { size: 1 })
        ));
        world.add_disjoint(&onto, &[&a, &b]).unwrap();
        let groups = world.disjoint_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn fusion_classes_cannot_be_edited() {
        let (mut world, onto) = setup();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        let o = world.create_individual(&onto, None, &[&a, &b]).unwrap();
        let fusion = world.type_of(&o).unwrap();
        assert!(fusion.is_fusion());
        assert!(world.add_is_a(&fusion, &a).is_err());
        assert!(world.is_subclass_of(&fusion, &a));
        assert_eq!(world.is_a(&fusion).unwrap().len(), 2);
    }
}
