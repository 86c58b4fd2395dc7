//! Ontology handles.
//!
//! An ontology is a named owner of statements. Entities are owned by the
//! ontology that first declared them; any ontology may reference them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::iri::Iri;

/// Process-unique ontology identifier, recorded as the owner of statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OntologyId(Uuid);

impl OntologyId {
    /// Deterministic id derived from the ontology IRI.
    #[must_use]
    pub fn for_iri(iri: &Iri) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, iri.as_str().as_bytes()))
    }
}

impl fmt::Display for OntologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct OntologyRecord {
    id: OntologyId,
    iri: Iri,
}

/// Shared handle to an ontology.
///
/// Two handles are equal only if they point at the same live ontology.
#[derive(Clone)]
pub struct Ontology(Arc<OntologyRecord>);

impl Ontology {
    pub(crate) fn new(iri: Iri) -> Self {
        Self(Arc::new(OntologyRecord {
            id: OntologyId::for_iri(&iri),
            iri,
        }))
    }

    /// Identifier derived from the IRI.
    #[must_use]
    pub fn id(&self) -> OntologyId {
        self.0.id
    }

    /// The ontology IRI; entity IRIs are built under it.
    #[must_use]
    pub fn iri(&self) -> &Iri {
        &self.0.iri
    }

    /// Returns the IRI of an entity named `name` in this ontology.
    pub fn entity_iri(&self, name: &str) -> Result<Iri, ValidationError> {
        self.0.iri.join(name)
    }
}

impl PartialEq for Ontology {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Ontology {}

impl fmt::Debug for Ontology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ontology({})", self.0.iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_iris_live_under_the_base() {
        let onto = Ontology::new(Iri::parse("http://test.org/onto_1.owl").unwrap());
        assert_eq!(
            onto.entity_iri("Pizza").unwrap().as_str(),
            "http://test.org/onto_1.owl#Pizza"
        );
    }

    #[test]
    fn ids_are_stable_per_iri() {
        let iri = Iri::parse("http://test.org/onto_1.owl").unwrap();
        assert_eq!(OntologyId::for_iri(&iri), OntologyId::for_iri(&iri));
        let a = Ontology::new(iri.clone());
        let b = Ontology::new(iri);
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }
}
