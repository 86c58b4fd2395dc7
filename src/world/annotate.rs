//! Annotations and aliases.
//!
//! Every write goes through [`World::rewrite_annotations`], which turns the
//! requested slice contents into one change set over the statement store.

use std::collections::HashSet;

use crate::annotation::{axiom_skeleton, AnnotationIndex, AnnotationKey, AnnotationTarget};
use crate::changeset::ChangeSet;
use crate::entity::{Entity, EntityKind};
use crate::error::{OntoError, OntoResult, ValidationError};
use crate::iri::Iri;
use crate::ontology::OntologyId;
use crate::statement::Statement;
use crate::value::{LangTag, Literal, Node, Value};
use crate::vocab;

use super::World;

fn parse_lang(lang: Option<&str>) -> OntoResult<Option<LangTag>> {
    Ok(lang.map(LangTag::parse).transpose()?)
}

impl World {
    pub(crate) fn annotation_index(&self) -> AnnotationIndex<'_> {
        AnnotationIndex::new(self.statements.as_ref(), &self.registry)
    }

    /// The ontology that owns annotations written on `target`.
    ///
    /// # Errors
    /// - `NotFound`: the entity is not registered, or the statement is not asserted
    fn annotation_owner(&self, target: &AnnotationTarget) -> OntoResult<OntologyId> {
        match target.as_statement() {
            None => {
                let entity = self.registry.require(target.subject())?;
                Ok(self.owner_of(&entity))
            }
            Some(statement) => self
                .statements
                .owner(&statement)
                .ok_or_else(|| OntoError::not_found(format!("statement {statement}"))),
        }
    }

    fn check_annotation_property(property: &Entity) -> OntoResult<()> {
        if property.kind() == EntityKind::AnnotationProperty {
            Ok(())
        } else {
            Err(ValidationError::WrongKind {
                iri: property.iri().clone(),
                expected: "annotation property",
                actual: property.kind(),
            }
            .into())
        }
    }

    /// Rewrites the annotation statements of `target` picked by `select` so
    /// that they hold `desired` in order, in one commit. Duplicate values
    /// collapse. An axiom node is created for the first value on a statement
    /// and dropped with the last one.
    ///
    /// Returns the picked statements as they were before.
    fn rewrite_annotations(
        &mut self,
        target: &AnnotationTarget,
        select: impl Fn(&Statement) -> bool,
        desired: Vec<(Iri, Node)>,
    ) -> OntoResult<Vec<Statement>> {
        let owner = if desired.is_empty() {
            None
        } else {
            Some(self.annotation_owner(target)?)
        };
        let index = self.annotation_index();
        let carriers = index.carriers(target);
        let (current, others): (Vec<Statement>, Vec<Statement>) =
            index.statements(target).into_iter().partition(|st| select(st));
        if current.is_empty() && desired.is_empty() {
            return Ok(current);
        }

        let mut cs = ChangeSet::new();
        let subject = match (carriers.first(), target.as_statement(), owner) {
            (Some(carrier), _, _) => carrier.clone(),
            (None, Some(statement), Some(owner)) => {
                let axiom = Node::blank();
                for st in axiom_skeleton(&axiom, &statement) {
                    cs.add(st, owner);
                }
                axiom
            }
            _ => return Ok(current),
        };

        let mut seen: HashSet<Statement> = HashSet::new();
        let desired: Vec<Statement> = desired
            .into_iter()
            .map(|(property, value)| Statement::new(subject.clone(), property, value))
            .filter(|st| seen.insert(st.clone()))
            .collect();
        let kept = current
            .iter()
            .zip(&desired)
            .take_while(|(old, new)| old == new)
            .count();
        for st in &current[kept..] {
            if !desired[kept..].contains(st) {
                cs.remove(st.clone());
            }
        }
        if let Some(owner) = owner {
            for st in &desired[kept..] {
                if current[kept..].contains(st) {
                    cs.move_to_end(st.clone(), owner);
                } else {
                    cs.add(st.clone(), owner);
                }
            }
        }
        if target.as_statement().is_some() {
            for carrier in &carriers {
                let used = others.iter().chain(&desired).any(|st| &st.subject == carrier);
                if !used {
                    let skeleton: Vec<Statement> = self
                        .statements
                        .find(Some(carrier), None, None)
                        .cloned()
                        .collect();
                    cs.extend_removals(skeleton);
                }
            }
        }

        self.commit(cs)?;
        Ok(current)
    }

    /// Rewrites one exact (property, language) slice.
    fn rewrite_slice(
        &mut self,
        target: &AnnotationTarget,
        key: AnnotationKey,
        values: Vec<Node>,
    ) -> OntoResult<Vec<Statement>> {
        let desired = values.into_iter().map(|v| (key.property.clone(), v)).collect();
        self.rewrite_annotations(target, move |st| key.matches(st), desired)
    }

    /// Values of `property` on `target`; without `lang`, every language variant.
    pub fn annotations(
        &self,
        target: &AnnotationTarget,
        property: &Entity,
        lang: Option<&str>,
    ) -> OntoResult<Vec<Node>> {
        Self::check_annotation_property(property)?;
        let lang = parse_lang(lang)?;
        Ok(self.annotation_index().get(target, property.iri(), lang.as_ref()))
    }

    /// Appends a value; a language-tagged literal is filed under its language.
    ///
    /// Appending a value the slice already holds is a no-op.
    ///
    /// # Errors
    /// - `NotFound`: the target entity is unknown, or the target statement is
    ///   not asserted
    pub fn add_annotation(
        &mut self,
        target: &AnnotationTarget,
        property: &Entity,
        value: impl Into<Node>,
    ) -> OntoResult<()> {
        Self::check_annotation_property(property)?;
        self.annotation_owner(target)?;
        let value = value.into();
        let key = AnnotationKey::for_value(property.iri(), &value);
        let mut values = self.annotation_index().slice(target, &key);
        values.push(value);
        self.rewrite_slice(target, key, values)?;
        Ok(())
    }

    /// Inserts a value at `index` of its (property, language) slice.
    ///
    /// A value already in the slice moves to `index`.
    pub fn insert_annotation(
        &mut self,
        target: &AnnotationTarget,
        property: &Entity,
        index: usize,
        value: impl Into<Node>,
    ) -> OntoResult<()> {
        Self::check_annotation_property(property)?;
        self.annotation_owner(target)?;
        let value = value.into();
        let key = AnnotationKey::for_value(property.iri(), &value);
        let mut values = self.annotation_index().slice(target, &key);
        values.retain(|v| v != &value);
        values.insert(index.min(values.len()), value);
        self.rewrite_slice(target, key, values)?;
        Ok(())
    }

    /// Replaces the (property, `lang`) slice with `values`.
    ///
    /// Plain strings take the slice language. An empty list deletes the slice.
    ///
    /// # Errors
    /// - `Validation(InvalidValue)`: a value carries another language, or a
    ///   non-string value is given for a language slice
    pub fn set_annotation(
        &mut self,
        target: &AnnotationTarget,
        property: &Entity,
        lang: Option<&str>,
        values: Vec<Node>,
    ) -> OntoResult<()> {
        Self::check_annotation_property(property)?;
        let lang = parse_lang(lang)?;
        let invalid = |reason: String| -> OntoError {
            ValidationError::InvalidValue {
                property: property.iri().clone(),
                reason,
            }
            .into()
        };

        let mut filed = Vec::with_capacity(values.len());
        for value in values {
            let value = match (&lang, value) {
                (Some(tag), Node::Literal(lit)) if lit.lang.as_ref() == Some(tag) => Node::Literal(lit),
                (
                    Some(tag),
                    Node::Literal(Literal {
                        value: Value::String(text),
                        lang: None,
                    }),
                ) => Node::Literal(Literal {
                    value: Value::String(text),
                    lang: Some(tag.clone()),
                }),
                (Some(tag), other) => {
                    return Err(invalid(format!("{other} does not belong to @{}", tag.as_str())));
                }
                (None, value) => {
                    if value.as_literal().is_some_and(|lit| lit.lang.is_some()) {
                        return Err(invalid(format!("{value} is language-tagged")));
                    }
                    value
                }
            };
            filed.push(value);
        }

        self.rewrite_slice(target, AnnotationKey::new(property.iri().clone(), lang), filed)?;
        Ok(())
    }

    /// Removes `value` from its slice, returning whether it was there.
    pub fn remove_annotation(
        &mut self,
        target: &AnnotationTarget,
        property: &Entity,
        value: impl Into<Node>,
    ) -> OntoResult<bool> {
        Self::check_annotation_property(property)?;
        let value = value.into();
        let key = AnnotationKey::for_value(property.iri(), &value);
        let mut values = self.annotation_index().slice(target, &key);
        let before = values.len();
        values.retain(|v| v != &value);
        if values.len() == before {
            return Ok(false);
        }
        self.rewrite_slice(target, key, values)?;
        Ok(true)
    }

    /// Deletes the (property, `lang`) slice, returning the number of values dropped.
    pub fn delete_annotation(
        &mut self,
        target: &AnnotationTarget,
        property: &Entity,
        lang: Option<&str>,
    ) -> OntoResult<usize> {
        Self::check_annotation_property(property)?;
        let key = AnnotationKey::new(property.iri().clone(), parse_lang(lang)?);
        Ok(self.rewrite_slice(target, key, Vec::new())?.len())
    }

    /// Number of distinct (property, language) keys holding a value.
    #[must_use]
    pub fn annotation_count(&self, target: &AnnotationTarget) -> usize {
        self.annotation_index().len(target)
    }

    /// Keys of `target` holding a value, in the order they were first filled.
    #[must_use]
    pub fn annotation_keys(&self, target: &AnnotationTarget) -> Vec<AnnotationKey> {
        self.annotation_index().keys(target)
    }

    /// Shorthand read: values of every property answering to `name`,
    /// sub-properties included.
    pub fn annotations_by_name(
        &self,
        target: &AnnotationTarget,
        name: &str,
        lang: Option<&str>,
    ) -> OntoResult<Vec<Node>> {
        let lang = parse_lang(lang)?;
        Ok(self.annotation_index().get_by_name(target, name, lang.as_ref()))
    }

    /// Shorthand write: clears every slice answering to `name` in every
    /// language, then files `values` under the property named `name`.
    ///
    /// # Errors
    /// - `NotFound`: no annotation property is named `name`
    pub fn set_annotations_by_name(
        &mut self,
        target: &AnnotationTarget,
        name: &str,
        values: Vec<Node>,
    ) -> OntoResult<()> {
        let index = self.annotation_index();
        let property = index
            .property_named(name)
            .ok_or_else(|| OntoError::not_found(format!("annotation property {name}")))?;
        let mut cleared = index.properties_named(target, name);
        cleared.insert(property.iri().clone());
        self.annotation_owner(target)?;

        let desired = values
            .into_iter()
            .map(|v| (property.iri().clone(), v))
            .collect();
        self.rewrite_annotations(target, move |st| cleared.contains(&st.predicate), desired)?;
        Ok(())
    }

    /// Shorthand delete; returns the number of slices removed.
    pub fn delete_annotations_by_name(
        &mut self,
        target: &AnnotationTarget,
        name: &str,
    ) -> OntoResult<usize> {
        let cleared = self.annotation_index().properties_named(target, name);
        let removed = self.rewrite_annotations(target, move |st| cleared.contains(&st.predicate), Vec::new())?;
        let keys: HashSet<AnnotationKey> = removed
            .iter()
            .map(|st| AnnotationKey::for_value(&st.predicate, &st.object))
            .collect();
        Ok(keys.len())
    }

    /// Gives `entity` an alias.
    ///
    /// The alias is stored as an annotation, supersedes the local name for
    /// attribute access and name lookups, and the identifier keeps resolving.
    pub fn set_alias(&mut self, entity: &Entity, alias: &str) -> OntoResult<()> {
        if alias.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let property = self.require(&vocab::iri(vocab::ALIAS))?;
        self.set_annotation(
            &AnnotationTarget::entity(entity),
            &property,
            None,
            vec![Node::from(alias)],
        )
    }

    /// Removes the alias of `entity`, returning it.
    pub fn clear_alias(&mut self, entity: &Entity) -> OntoResult<Option<String>> {
        let previous = self.alias_of(entity);
        let property = self.require(&vocab::iri(vocab::ALIAS))?;
        self.delete_annotation(&AnnotationTarget::entity(entity), &property, None)?;
        Ok(previous)
    }

    /// The alias of `entity`, if one is set.
    #[must_use]
    pub fn alias_of(&self, entity: &Entity) -> Option<String> {
        self.registry.alias_of(entity).map(str::to_string)
    }

    /// Re-derives the alias of an entity from its alias statements.
    pub(crate) fn sync_alias(&mut self, iri: &Iri) {
        let Some(entity) = self.registry.resolve(iri) else {
            return;
        };
        let target = AnnotationTarget::entity(&entity);
        let alias = self
            .annotation_index()
            .get(&target, &vocab::iri(vocab::ALIAS), None)
            .iter()
            .find_map(|v| v.as_str().map(str::to_string));
        let accessible = matches!(
            entity.kind(),
            EntityKind::ObjectProperty | EntityKind::DataProperty
        );

        match alias {
            Some(alias) => {
                if self.registry.alias_of(&entity) != Some(alias.as_str()) {
                    self.registry.set_alias(&entity, &alias);
                    if accessible {
                        self.accessors.register(&entity, &alias);
                    }
                }
            }
            None => {
                if self.registry.clear_alias(&entity).is_some() && accessible {
                    self.accessors.register(&entity, entity.name());
                }
            }
        }
    }
}
