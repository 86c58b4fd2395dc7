//! Subject–predicate–object statements, the only persisted facts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::iri::Iri;
use crate::value::Node;
use crate::vocab;

/// An ordered triple. A language tag, when present, lives on the literal object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    /// An IRI or an anonymous node.
    pub subject: Node,
    /// Always a named property.
    pub predicate: Iri,
    /// An IRI, anonymous node or literal.
    pub object: Node,
}

impl Statement {
    /// Creates a statement.
    #[must_use]
    pub fn new(subject: impl Into<Node>, predicate: Iri, object: impl Into<Node>) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }

    /// Shorthand for an `rdf:type` statement.
    #[must_use]
    pub fn typed(subject: impl Into<Node>, class: impl Into<Node>) -> Self {
        Self::new(subject, vocab::iri(vocab::RDF_TYPE), class)
    }

    /// Returns true if the predicate equals the given vocabulary term.
    #[must_use]
    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.predicate.as_str() == predicate
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_uses_rdf_type() {
        let s = Iri::parse("http://test.org/o#a").unwrap();
        let c = Iri::parse("http://test.org/o#C").unwrap();
        let st = Statement::typed(s, c);
        assert!(st.has_predicate(vocab::RDF_TYPE));
        assert_eq!(
            st.to_string(),
            "<http://test.org/o#a> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://test.org/o#C>"
        );
    }
}
