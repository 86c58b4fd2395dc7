//! `idle -> exporting -> waiting_external -> merging -> idle`.

use chrono::Utc;
use tracing::{info, warn};

use crate::changeset::ChangeSet;
use crate::entity::Entity;
use crate::error::{OntoResult, ReasonerError, ValidationError};
use crate::expr::ClassExpr;
use crate::iri::Iri;
use crate::ontology::Ontology;
use crate::statement::Statement;
use crate::vocab;
use crate::world::World;

use super::{export, Classifier, InferredFact, ProcessClassifier, ReasonerInput, ReasonerOutput, SyncReport, SyncState};

/// Inferred facts turned into statements, not yet committed.
struct MergePlan {
    changes: ChangeSet,
    skipped: usize,
}

impl World {
    /// Current phase of the reasoner synchronization.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    fn enter(&mut self, onto: &Ontology, state: SyncState) {
        self.sync_state = state;
        info!(ontology = %onto.iri(), state = %state, "reasoner sync");
    }

    /// Classifies `onto` and merges the inferred facts.
    ///
    /// Inferred memberships become `rdf:type` statements (so fusion classes
    /// follow them), inferred subclass and equivalence edges become
    /// `rdfs:subClassOf` / `owl:equivalentClass` statements. Facts already
    /// implied by the asserted hierarchy and facts about `owl:Nothing` are
    /// skipped.
    ///
    /// # Errors
    /// - `ReasonerFailure`: the classifier failed, timed out, reported an
    ///   inconsistency or referenced an unknown entity. The store and every
    ///   fusion mapping are left exactly as before the call.
    pub fn sync_reasoner(
        &mut self,
        onto: &Ontology,
        classifier: &dyn Classifier,
    ) -> OntoResult<SyncReport> {
        if self.sync_state != SyncState::Idle {
            return Err(ReasonerError::Busy {
                state: self.sync_state.to_string(),
            }
            .into());
        }
        self.require_live(onto)?;

        let result = self.run_sync(onto, classifier);
        if let Err(err) = &result {
            warn!(ontology = %onto.iri(), error = %err, "reasoner sync failed; store unchanged");
        }
        self.enter(onto, SyncState::Idle);
        result
    }

    /// Runs the classifier from the world configuration.
    ///
    /// # Errors
    /// - `Validation(InvalidConfig)`: no reasoner program is configured
    pub fn sync_configured_reasoner(&mut self, onto: &Ontology) -> OntoResult<SyncReport> {
        let classifier = ProcessClassifier::from_config(&self.config.reasoner).ok_or_else(|| {
            ValidationError::InvalidConfig {
                reason: "no reasoner program configured".to_string(),
            }
        })?;
        self.sync_reasoner(onto, &classifier)
    }

    fn run_sync(&mut self, onto: &Ontology, classifier: &dyn Classifier) -> OntoResult<SyncReport> {
        let started_at = Utc::now();

        self.enter(onto, SyncState::Exporting);
        let statements = self.statements_of(onto);
        let input = ReasonerInput {
            ontology: onto.iri().clone(),
            ntriples: export::to_ntriples(&statements)?,
            statement_count: statements.len(),
        };

        self.enter(onto, SyncState::WaitingExternal);
        let output = classifier.classify(&input)?;

        self.enter(onto, SyncState::Merging);
        if !output.is_consistent() {
            return Err(ReasonerError::Inconsistent {
                details: output.inconsistencies,
            }
            .into());
        }
        let plan = self.plan_merge(&output)?;
        let fusion_before = self.fusion.len();
        let applied = self
            .commit(plan.changes)
            .map_err(|err| ReasonerError::MergeRejected {
                reason: err.to_string(),
            })?;

        let report = SyncReport {
            ontology: onto.iri().clone(),
            started_at,
            finished_at: Utc::now(),
            facts_received: output.facts.len(),
            facts_skipped: plan.skipped,
            statements_added: applied.added.len(),
            fusion_classes_created: self.fusion.len().saturating_sub(fusion_before),
        };
        info!(
            ontology = %onto.iri(),
            facts = report.facts_received,
            skipped = report.facts_skipped,
            added = report.statements_added,
            "merged reasoner output"
        );
        Ok(report)
    }

    fn inferred_entity(&self, iri: &Iri, class: bool) -> OntoResult<Entity> {
        let entity = self
            .registry
            .resolve(iri)
            .ok_or_else(|| ReasonerError::UnknownEntity { iri: iri.clone() })?;
        let matches = if class {
            entity.is_class()
        } else {
            entity.is_individual()
        };
        if matches {
            Ok(entity)
        } else {
            let expected = if class { "class" } else { "individual" };
            Err(ReasonerError::MalformedOutput {
                reason: format!("{iri} is a {}, expected a {expected}", entity.kind()),
            }
            .into())
        }
    }

    /// Stages every new fact of `output` in enumeration order.
    fn plan_merge(&self, output: &ReasonerOutput) -> OntoResult<MergePlan> {
        let nothing = |iri: &Iri| iri.as_str() == vocab::OWL_NOTHING;
        let mut memberships: Vec<(Entity, Vec<Entity>)> = Vec::new();
        let mut changes = ChangeSet::new();
        let mut skipped = 0;

        for fact in &output.facts {
            match fact {
                InferredFact::Member { individual, class } => {
                    if nothing(class) {
                        skipped += 1;
                        continue;
                    }
                    let individual = self.inferred_entity(individual, false)?;
                    let class = self.inferred_entity(class, true)?;
                    if self.is_instance_of(&individual, &class) {
                        skipped += 1;
                        continue;
                    }
                    match memberships.iter_mut().find(|(i, _)| i.same(&individual)) {
                        Some((_, classes)) => {
                            if !classes.iter().any(|c| c.same(&class)) {
                                classes.push(class);
                            }
                        }
                        None => memberships.push((individual, vec![class])),
                    }
                }
                InferredFact::Subclass { sub, sup } => {
                    if nothing(sub) || nothing(sup) || sub == sup {
                        skipped += 1;
                        continue;
                    }
                    let sub = self.inferred_entity(sub, true)?;
                    let sup = self.inferred_entity(sup, true)?;
                    if self.is_subclass_of(&sub, &sup) {
                        skipped += 1;
                        continue;
                    }
                    changes.add(
                        Statement::new(sub.node(), vocab::iri(vocab::RDFS_SUBCLASS_OF), sup.node()),
                        self.owner_of(&sub),
                    );
                }
                InferredFact::Equivalent { a, b } => {
                    if nothing(a) || nothing(b) || a == b {
                        skipped += 1;
                        continue;
                    }
                    let a = self.inferred_entity(a, true)?;
                    let b = self.inferred_entity(b, true)?;
                    if self.equivalent_to(&a)?.contains(&ClassExpr::Named(b.clone())) {
                        skipped += 1;
                        continue;
                    }
                    changes.add(
                        Statement::new(a.node(), vocab::iri(vocab::OWL_EQUIVALENT_CLASS), b.node()),
                        self.owner_of(&a),
                    );
                }
            }
        }

        // Keep only the most specific new classes of each individual. Of
        // several equivalent classes, the first reported one is kept.
        for (individual, classes) in memberships {
            for (index, class) in classes.iter().enumerate() {
                let implied = classes.iter().enumerate().any(|(other_index, other)| {
                    other_index != index
                        && self.is_subclass_of(other, class)
                        && (other_index < index || !self.is_subclass_of(class, other))
                });
                if implied {
                    skipped += 1;
                    continue;
                }
                changes.add(
                    Statement::typed(individual.node(), class.node()),
                    self.owner_of(&individual),
                );
            }
        }

        Ok(MergePlan { changes, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(facts: Vec<InferredFact>) -> impl Fn(&ReasonerInput) -> Result<ReasonerOutput, ReasonerError> {
        move |_| {
            Ok(ReasonerOutput {
                facts: facts.clone(),
                inconsistencies: Vec::new(),
            })
        }
    }

    #[test]
    fn membership_is_merged_and_state_returns_to_idle() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world.declare_class(&onto, "B", &[]).unwrap();
        let o = world.create_individual(&onto, Some("o"), &[&a]).unwrap();

        let classifier = scripted(vec![InferredFact::Member {
            individual: o.iri().clone(),
            class: b.iri().clone(),
        }]);
        let report = world.sync_reasoner(&onto, &classifier).unwrap();
        assert_eq!(report.statements_added, 1);
        assert_eq!(report.fusion_classes_created, 1);
        assert!(world.is_instance_of(&o, &b));
        assert_eq!(world.sync_state(), SyncState::Idle);
    }

    #[test]
    fn implied_facts_are_skipped() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let b = world
            .declare_class(&onto, "B", &[ClassExpr::from(&a)])
            .unwrap();
        let o = world.create_individual(&onto, Some("o"), &[&b]).unwrap();

        let classifier = scripted(vec![
            InferredFact::Member {
                individual: o.iri().clone(),
                class: a.iri().clone(),
            },
            InferredFact::Subclass {
                sub: b.iri().clone(),
                sup: a.iri().clone(),
            },
            InferredFact::Member {
                individual: o.iri().clone(),
                class: vocab::iri(vocab::OWL_NOTHING),
            },
        ]);
        let before = world.statement_count();
        let report = world.sync_reasoner(&onto, &classifier).unwrap();
        assert_eq!(report.facts_skipped, 3);
        assert_eq!(world.statement_count(), before);
        assert!(world.type_of(&o).unwrap().same(&b));
    }

    #[test]
    fn unknown_entity_aborts_merge() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let o = world.create_individual(&onto, Some("o"), &[]).unwrap();
        let before = world.statement_count();

        let classifier = scripted(vec![
            InferredFact::Member {
                individual: o.iri().clone(),
                class: a.iri().clone(),
            },
            InferredFact::Member {
                individual: o.iri().clone(),
                class: onto.entity_iri("Ghost").unwrap(),
            },
        ]);
        let err = world.sync_reasoner(&onto, &classifier).unwrap_err();
        assert!(err.is_reasoner_failure());
        assert_eq!(world.statement_count(), before);
        assert!(!world.is_instance_of(&o, &a));
        assert_eq!(world.sync_state(), SyncState::Idle);
    }

    #[test]
    fn equivalent_memberships_keep_one_class() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let x = world.declare_class(&onto, "X", &[]).unwrap();
        let y = world.declare_class(&onto, "Y", &[]).unwrap();
        world.add_equivalent(&x, &y).unwrap();
        let o = world.create_individual(&onto, Some("o"), &[&a]).unwrap();

        let classifier = scripted(vec![
            InferredFact::Member {
                individual: o.iri().clone(),
                class: x.iri().clone(),
            },
            InferredFact::Member {
                individual: o.iri().clone(),
                class: y.iri().clone(),
            },
        ]);
        let report = world.sync_reasoner(&onto, &classifier).unwrap();
        assert_eq!(report.statements_added, 1);
        assert_eq!(report.facts_skipped, 1);
        assert!(world.is_instance_of(&o, &x));
        assert!(world.is_instance_of(&o, &y));
        assert_eq!(
            world.is_a(&o).unwrap(),
            vec![ClassExpr::from(&a), ClassExpr::from(&x)]
        );
    }

    #[test]
    fn wrong_kind_in_output_is_a_reasoner_failure() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        let a = world.declare_class(&onto, "A", &[]).unwrap();
        let rel = world
            .declare_object_property(&onto, "rel", crate::world::PropertyOptions::new())
            .unwrap();
        let o = world.create_individual(&onto, Some("o"), &[&a]).unwrap();
        let before = world.statement_count();

        let classifier = scripted(vec![InferredFact::Member {
            individual: o.iri().clone(),
            class: rel.iri().clone(),
        }]);
        let err = world.sync_reasoner(&onto, &classifier).unwrap_err();
        assert!(err.is_reasoner_failure());
        assert!(err.to_string().contains("expected a class"));
        assert_eq!(world.statement_count(), before);

        let classifier = scripted(vec![InferredFact::Subclass {
            sub: a.iri().clone(),
            sup: o.iri().clone(),
        }]);
        assert!(world
            .sync_reasoner(&onto, &classifier)
            .unwrap_err()
            .is_reasoner_failure());
        assert_eq!(world.sync_state(), SyncState::Idle);
    }

    #[test]
    fn missing_configuration_is_rejected() {
        let mut world = World::new();
        let onto = world.ontology("http://test.org/r.owl").unwrap();
        assert!(world.sync_configured_reasoner(&onto).unwrap_err().is_validation());
    }
}
