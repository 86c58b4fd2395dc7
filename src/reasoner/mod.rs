//! Reasoner synchronization.
//!
//! The classifier is an external, blocking step behind the [`Classifier`]
//! trait. [`World::sync_reasoner`](crate::World::sync_reasoner) exports an
//! ontology as N-Triples, hands it to the classifier, and stages every
//! inferred fact in a change set that is committed only after the external
//! step fully succeeded.

mod bridge;
mod export;
mod process;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReasonerError;
use crate::iri::Iri;

pub use export::to_ntriples;
pub use process::ProcessClassifier;

/// The exported ontology handed to a classifier.
#[derive(Debug, Clone)]
pub struct ReasonerInput {
    /// The ontology being classified.
    pub ontology: Iri,
    /// The ontology's statements, one N-Triples line each.
    pub ntriples: String,
    /// Number of lines in `ntriples`.
    pub statement_count: usize,
}

/// One entailed fact reported by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferredFact {
    /// `individual` is an instance of `class`.
    Member {
        /// The classified individual.
        individual: Iri,
        /// A class it belongs to.
        class: Iri,
    },
    /// `sub` is a subclass of `sup`.
    Subclass {
        /// The narrower class.
        sub: Iri,
        /// The broader class.
        sup: Iri,
    },
    /// `a` and `b` are equivalent classes.
    Equivalent {
        /// One class.
        a: Iri,
        /// The other class.
        b: Iri,
    },
}

/// Classifier result, in the order facts should be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerOutput {
    /// Entailments to merge.
    pub facts: Vec<InferredFact>,
    /// Non-empty when the ontology is inconsistent.
    pub inconsistencies: Vec<String>,
}

impl ReasonerOutput {
    /// Parses the JSON a classifier process writes to stdout.
    pub fn from_json(json: &str) -> Result<Self, ReasonerError> {
        serde_json::from_str(json).map_err(|err| ReasonerError::MalformedOutput {
            reason: err.to_string(),
        })
    }

    /// Returns true when no inconsistency was reported.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

/// The blocking classifier boundary.
pub trait Classifier {
    /// Classifies the exported ontology.
    fn classify(&self, input: &ReasonerInput) -> Result<ReasonerOutput, ReasonerError>;
}

impl<F> Classifier for F
where
    F: Fn(&ReasonerInput) -> Result<ReasonerOutput, ReasonerError>,
{
    fn classify(&self, input: &ReasonerInput) -> Result<ReasonerOutput, ReasonerError> {
        self(input)
    }
}

/// Phase of a synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No synchronization is running.
    #[default]
    Idle,
    /// The ontology is being rendered for the classifier.
    Exporting,
    /// Blocked on the classifier.
    WaitingExternal,
    /// Inferred facts are being committed.
    Merging,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Exporting => "exporting",
            Self::WaitingExternal => "waiting_external",
            Self::Merging => "merging",
        };
        f.write_str(s)
    }
}

/// Summary of a successful synchronization.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// The synchronized ontology.
    pub ontology: Iri,
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// When the merge committed.
    pub finished_at: DateTime<Utc>,
    /// Facts reported by the classifier.
    pub facts_received: usize,
    /// Facts dropped because they were already implied or mention `owl:Nothing`.
    pub facts_skipped: usize,
    /// Statements the merge added to the store.
    pub statements_added: usize,
    /// Fusion classes created by re-binding after the merge.
    pub fusion_classes_created: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_parses_tagged_facts() {
        let json = r#"{
            "facts": [
                {"kind": "member", "individual": "http://t.org/o#a", "class": "http://t.org/o#C"},
                {"kind": "subclass", "sub": "http://t.org/o#C", "sup": "http://t.org/o#D"}
            ]
        }"#;
        let output = ReasonerOutput::from_json(json).unwrap();
        assert_eq!(output.facts.len(), 2);
        assert!(output.is_consistent());
        assert!(matches!(output.facts[0], InferredFact::Member { .. }));
    }

    #[test]
    fn malformed_output_is_reported() {
        let err = ReasonerOutput::from_json("{\"facts\": 3}").unwrap_err();
        assert!(matches!(err, ReasonerError::MalformedOutput { .. }));
    }

    #[test]
    fn closures_are_classifiers() {
        let classifier = |_: &ReasonerInput| -> Result<ReasonerOutput, ReasonerError> {
            Ok(ReasonerOutput {
                facts: Vec::new(),
                inconsistencies: vec!["clash".to_string()],
            })
        };
        let input = ReasonerInput {
            ontology: Iri::parse("http://t.org/o").unwrap(),
            ntriples: String::new(),
            statement_count: 0,
        };
        assert!(!classifier.classify(&input).unwrap().is_consistent());
        assert_eq!(SyncState::WaitingExternal.to_string(), "waiting_external");
    }
}
