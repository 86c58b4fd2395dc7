//! Entity identifiers.
//!
//! Every entity, ontology and predicate is addressed by an [`Iri`]. Parsing
//! goes through `oxrdf` so an identifier accepted here is always exportable to
//! the reasoner exchange format.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Globally unique, immutable entity identifier.
///
/// Cloning is cheap; the text is shared.
///
/// # Examples
///
/// ```
/// use ontosync::Iri;
///
/// let iri = Iri::parse("http://test.org/onto.owl#Pizza").unwrap();
/// assert_eq!(iri.local_name(), "Pizza");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri(Arc<str>);

impl Iri {
    /// Parses and validates an absolute IRI.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(ValidationError::InvalidIri {
                iri: String::new(),
                reason: "empty".to_string(),
            });
        }
        oxrdf::NamedNode::new(value).map_err(|e| ValidationError::InvalidIri {
            iri: value.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(Arc::from(value)))
    }

    /// Wraps a string that is known to be a valid IRI (vocabulary constants).
    pub(crate) fn new_unchecked(value: &str) -> Self {
        Self(Arc::from(value))
    }

    /// Returns the IRI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the fragment or last path segment, the default display name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        let text = self.as_str();
        let trimmed = text.trim_end_matches(['#', '/']);
        match trimmed.rfind(['#', '/', ':']) {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed,
        }
    }

    /// Returns everything before the local name.
    #[must_use]
    pub fn namespace(&self) -> &str {
        let local = self.local_name();
        let text = self.as_str();
        match text.rfind(local) {
            Some(pos) if !local.is_empty() => &text[..pos],
            _ => text,
        }
    }

    /// Joins a local name onto this IRI used as a base.
    ///
    /// A `#` separator is inserted unless the base already ends with `#` or `/`.
    pub fn join(&self, name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let base = self.as_str();
        if base.ends_with('#') || base.ends_with('/') {
            Self::parse(format!("{base}{name}"))
        } else {
            Self::parse(format!("{base}#{name}"))
        }
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl TryFrom<String> for Iri {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Iri {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.0.to_string()
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
