//! # ontosync - An ontology store with reasoner synchronization
//!
//! ontosync keeps OWL-style ontologies in one statement store and derives
//! every higher-level view from it: type lists, property values, class
//! expressions and annotations. Individuals asserted into several classes
//! get a memoized fusion class, inverse properties stay mirrored, and an
//! external classifier can be run against an ontology with all-or-nothing
//! merging of its results.
//!
//! ## Core Concepts
//!
//! - **World**: owns the statement store and hosts any number of ontologies
//! - **Entity**: a class, property or individual, one handle per identifier
//! - **Statement**: a subject-predicate-object fact, the only persisted data
//! - **Fusion class**: the synthetic live type of a multiply-typed individual
//! - **Annotation**: a statement about an entity or about another statement
//! - **Classifier**: the blocking boundary to an external reasoner
//!
//! ## Usage
//!
//! ```rust
//! use ontosync::{PropertyOptions, World};
//!
//! let mut world = World::new();
//! let onto = world.ontology("http://test.org/onto.owl")?;
//! let obj = world.declare_class(&onto, "Obj", &[])?;
//! let rel = world.declare_object_property(&onto, "rel", PropertyOptions::new())?;
//! let inv = world.declare_object_property(&onto, "inv", PropertyOptions::new().inverse_of(&rel))?;
//!
//! let a = world.create_individual(&onto, None, &[&obj])?;
//! let b = world.create_individual(&onto, None, &[&obj])?;
//! world.attr(&a, "rel")?.append(&b)?;
//! assert!(world.property(&b, &inv)?.contains(&a));
//! # Ok::<(), ontosync::OntoError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core values
pub mod error;
pub mod iri;
pub mod statement;
pub mod value;
pub mod vocab;

// Entities and expressions
pub mod entity;
pub mod expr;
pub mod ontology;
pub mod registry;

// Components
pub mod annotation;
pub mod changeset;
pub mod config;
pub mod fusion;
pub mod property;
pub mod storage;

// Facade, documents and reasoning
pub mod document;
pub mod reasoner;
pub mod world;

pub use annotation::{AnnotationKey, AnnotationTarget};
pub use changeset::{Applied, ChangeSet};
pub use config::{ReasonerConfig, WorldConfig};
pub use document::{OntologyDocument, FORMAT_VERSION};
pub use entity::{Entity, EntityKind};
pub use error::{OntoError, OntoResult, ReasonerError, ValidationError};
pub use expr::{ClassExpr, Filler, Quantifier};
pub use fusion::{FusionClassManager, Rebind};
pub use iri::Iri;
pub use ontology::{Ontology, OntologyId};
pub use property::{AccessorRegistry, PropertyProxy};
pub use reasoner::{
    Classifier, InferredFact, ProcessClassifier, ReasonerInput, ReasonerOutput, SyncReport,
    SyncState,
};
pub use registry::EntityRegistry;
pub use statement::Statement;
pub use storage::{Detached, InMemoryStatementStore, StatementStore, StorageError};
pub use value::{BlankId, LangTag, Literal, Node, Value};
pub use world::{PropertyOptions, World};
