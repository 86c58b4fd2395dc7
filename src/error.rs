//! Error types for ontosync.
//!
//! All errors are strongly typed using thiserror. Every error that leaves the
//! crate is an [`OntoError`]; its variants map onto the four failure kinds of
//! the store (kind conflicts, cardinality violations, reasoner failures and
//! missing entities) plus input validation and document plumbing.

use thiserror::Error;

use crate::entity::EntityKind;
use crate::iri::Iri;
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A name or alias was empty.
    #[error("Entity name cannot be empty")]
    EmptyName,

    /// Text that does not parse as an absolute IRI.
    #[error("Invalid IRI '{iri}': {reason}")]
    InvalidIri {
        /// The identifier involved.
        iri: String,
        /// What was wrong.
        reason: String,
    },

    /// A language tag that is not BCP 47 shaped.
    #[error("Invalid language tag '{tag}'")]
    InvalidLanguageTag {
        /// The rejected tag.
        tag: String,
    },

    /// A statement subject was a literal.
    #[error("A literal cannot be the subject of a statement")]
    LiteralSubject,

    /// An entity of another kind was passed where `expected` is required.
    #[error("Entity {iri} is a {actual}, expected {expected}")]
    WrongKind {
        /// The identifier involved.
        iri: Iri,
        /// The kind that was required.
        expected: &'static str,
        /// The kind the entity has.
        actual: EntityKind,
    },

    /// A single-value read on a property that may hold several values.
    #[error("Property {property} is not functional for this subject")]
    NotFunctional {
        /// The property involved.
        property: Iri,
    },

    /// A value rejected by the range or the slice language of a property.
    #[error("Invalid value for property {property}: {reason}")]
    InvalidValue {
        /// The property involved.
        property: Iri,
        /// What was wrong.
        reason: String,
    },

    /// A disjointness axiom with fewer than two classes.
    #[error("A disjointness group needs at least 2 classes, got {size}")]
    DisjointGroupTooSmall {
        /// Number of classes given.
        size: usize,
    },

    /// A configuration value out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A class expression that cannot be encoded or decoded.
    #[error("Malformed class expression: {reason}")]
    MalformedExpression {
        /// What was wrong.
        reason: String,
    },
}

/// Errors raised by the reasoner boundary.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The classifier process could not be started or fed.
    #[error("Failed to start reasoner '{program}': {message}")]
    Spawn {
        /// The configured program.
        program: String,
        /// Underlying error text.
        message: String,
    },

    /// The classifier process exited unsuccessfully.
    #[error("Reasoner exited with status {code:?}: {stderr}")]
    ExitStatus {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The classifier output is not valid, or names an entity of the wrong kind.
    #[error("Reasoner output is malformed: {reason}")]
    MalformedOutput {
        /// What was wrong.
        reason: String,
    },

    /// The classifier found the ontology inconsistent.
    #[error("Ontology is inconsistent: {}", .details.join("; "))]
    Inconsistent {
        /// One line per reported inconsistency.
        details: Vec<String>,
    },

    /// The classifier did not answer within the timeout.
    #[error("Reasoner timed out after {timeout_ms}ms")]
    TimedOut {
        /// The configured timeout.
        timeout_ms: u64,
    },

    /// A fact names an IRI the world does not know.
    #[error("Reasoner referenced unknown entity {iri}")]
    UnknownEntity {
        /// The identifier involved.
        iri: Iri,
    },

    /// A synchronization is already in progress.
    #[error("A synchronization is already running ({state})")]
    Busy {
        /// The phase of the running synchronization.
        state: String,
    },

    /// The merge plan was refused by the store.
    #[error("Inferred facts could not be merged: {reason}")]
    MergeRejected {
        /// What was wrong.
        reason: String,
    },
}

/// Top-level error type for ontosync.
#[derive(Debug, Error)]
pub enum OntoError {
    /// An identifier was declared with a second, different kind.
    #[error("Kind conflict: {iri} is already a {existing}, cannot redeclare it as a {requested}")]
    KindConflict {
        /// The identifier involved.
        iri: Iri,
        /// Kind already registered.
        existing: EntityKind,
        /// Kind of the new declaration.
        requested: EntityKind,
    },

    /// A write would give a functional property a second value.
    #[error("Cardinality violation on {subject} {property}: {reason}")]
    CardinalityViolation {
        /// Subject of the write.
        subject: Iri,
        /// The property involved.
        property: Iri,
        /// What was wrong.
        reason: String,
    },

    /// The classifier run failed; nothing was merged.
    #[error("Reasoner failure: {0}")]
    ReasonerFailure(#[from] ReasonerError),

    /// An entity, ontology, statement or document does not exist.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
    },

    /// Input was rejected before anything was written.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reading, writing or parsing a document failed.
    #[error("Document error: {message}")]
    Document {
        /// Underlying error text.
        message: String,
    },

    /// An invariant of the store was broken.
    #[error("Internal error: {message}")]
    Internal {
        /// Underlying error text.
        message: String,
    },
}

impl OntoError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a document error.
    #[must_use]
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    /// Returns true if this is a kind conflict.
    #[must_use]
    pub const fn is_kind_conflict(&self) -> bool {
        matches!(self, Self::KindConflict { .. })
    }

    /// Returns true if this is a cardinality violation.
    #[must_use]
    pub const fn is_cardinality_violation(&self) -> bool {
        matches!(self, Self::CardinalityViolation { .. })
    }

    /// Returns true if the reasoner step failed.
    #[must_use]
    pub const fn is_reasoner_failure(&self) -> bool {
        matches!(self, Self::ReasonerFailure(_))
    }

    /// Returns true if a lookup had no match.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Nothing is retried automatically; this only informs the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReasonerFailure(ReasonerError::TimedOut { .. } | ReasonerError::Spawn { .. })
        )
    }
}

impl From<StorageError> for OntoError {
    fn from(err: StorageError) -> Self {
        Self::internal(err.to_string())
    }
}

/// Result type alias for ontosync operations.
pub type OntoResult<T> = Result<T, OntoError>;
