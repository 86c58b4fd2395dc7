//! Terms that can appear in a statement.
//!
//! A statement object is a [`Node`]: a named entity, an anonymous node (used
//! for class expressions), or a [`Literal`]. String literals may carry a
//! language tag.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::iri::Iri;
use crate::vocab;

/// Literal payloads.
///
/// # Examples
///
/// ```
/// use ontosync::Value;
///
/// let v = Value::from(10.0);
/// assert!(v.is_float());
/// assert_eq!(v.datatype(), "http://www.w3.org/2001/XMLSchema#double");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// `xsd:boolean`.
    Bool(bool),
    /// `xsd:integer`.
    Int(i64),
    /// `xsd:double`.
    Float(f64),
    /// `xsd:string`, possibly language-tagged on a literal.
    String(String),
}

impl Value {
    /// Returns true for booleans.
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns true for integers.
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns true for floats.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns true for strings.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// The boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The number as a float; integers convert.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The text, if this is a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Returns the XSD datatype IRI of this value.
    #[must_use]
    pub const fn datatype(&self) -> &'static str {
        match self {
            Self::Bool(_) => vocab::XSD_BOOLEAN,
            Self::Int(_) => vocab::XSD_INTEGER,
            Self::Float(_) => vocab::XSD_DOUBLE,
            Self::String(_) => vocab::XSD_STRING,
        }
    }

    /// Returns the lexical form used in exchange formats.
    #[must_use]
    pub fn lexical(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format!("{v:?}"),
            Self::String(v) => v.clone(),
        }
    }
}

// Floats compare by bit pattern so literals can key hash indexes.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

fn lang_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").unwrap()
    })
}

/// A normalized (lowercase) language tag such as `en` or `fr-be`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LangTag(String);

impl LangTag {
    /// Parses a language tag.
    pub fn parse(tag: impl AsRef<str>) -> Result<Self, ValidationError> {
        let tag = tag.as_ref().trim();
        if !lang_tag_regex().is_match(tag) {
            return Err(ValidationError::InvalidLanguageTag {
                tag: tag.to_string(),
            });
        }
        Ok(Self(tag.to_ascii_lowercase()))
    }

    /// The normalized, lowercase tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LangTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LangTag {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<LangTag> for String {
    fn from(tag: LangTag) -> Self {
        tag.0
    }
}

/// A literal object, optionally language-tagged when it is a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// The typed value.
    pub value: Value,
    /// Only string values carry a language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<LangTag>,
}

impl Literal {
    /// Creates an untagged literal.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            lang: None,
        }
    }

    /// Creates a language-tagged string literal.
    pub fn tagged(text: impl Into<String>, lang: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            value: Value::String(text.into()),
            lang: Some(LangTag::parse(lang)?),
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lang {
            Some(lang) => write!(f, "{}@{lang}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Identifier of an anonymous node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlankId(Uuid);

impl BlankId {
    /// Creates a fresh anonymous node id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the id in a form usable as an N-Triples blank node label.
    #[must_use]
    pub fn label(&self) -> String {
        format!("b{}", self.0.simple())
    }
}

impl Default for BlankId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.label())
    }
}

/// Any term of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "term", rename_all = "snake_case")]
pub enum Node {
    /// A named resource.
    Iri(Iri),
    /// An anonymous resource.
    Blank(BlankId),
    /// A data value.
    Literal(Literal),
}

impl Node {
    /// Creates a fresh anonymous node.
    #[must_use]
    pub fn blank() -> Self {
        Self::Blank(BlankId::new())
    }

    /// Returns true for IRIs and anonymous nodes (anything usable as a subject).
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    /// The IRI, for named resources.
    pub const fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The id, for anonymous nodes.
    pub const fn as_blank(&self) -> Option<BlankId> {
        match self {
            Self::Blank(id) => Some(*id),
            _ => None,
        }
    }

    /// The literal, for data values.
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Returns the text of a string literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_literal().and_then(|lit| lit.value.as_string())
    }

    /// Returns the same node without a language tag.
    #[must_use]
    pub fn without_lang(&self) -> Self {
        match self {
            Self::Literal(lit) if lit.lang.is_some() => Self::Literal(Literal::new(lit.value.clone())),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(id) => write!(f, "{id}"),
            Self::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

impl From<Iri> for Node {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<&Iri> for Node {
    fn from(iri: &Iri) -> Self {
        Self::Iri(iri.clone())
    }
}

impl From<BlankId> for Node {
    fn from(id: BlankId) -> Self {
        Self::Blank(id)
    }
}

impl From<Literal> for Node {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Literal(Literal::new(value))
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Self::Literal(Literal::new(v))
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Self::Literal(Literal::new(v))
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Self::Literal(Literal::new(v))
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Self::Literal(Literal::new(v))
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Self::Literal(Literal::new(v))
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Self::Literal(Literal::new(v))
    }
}
