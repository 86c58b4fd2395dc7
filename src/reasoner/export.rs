//! N-Triples rendering through `oxrdf`.

use oxrdf::{BlankNode, Literal as RdfLiteral, NamedNode, Term, Triple};

use crate::error::ReasonerError;
use crate::statement::Statement;
use crate::value::{BlankId, Literal, Node};

fn named(iri: &crate::iri::Iri) -> NamedNode {
    NamedNode::new_unchecked(iri.as_str())
}

fn blank(id: BlankId) -> BlankNode {
    BlankNode::new_unchecked(id.label())
}

fn literal(lit: &Literal) -> Result<RdfLiteral, ReasonerError> {
    let lexical = lit.value.lexical();
    match &lit.lang {
        Some(lang) => RdfLiteral::new_language_tagged_literal(lexical, lang.as_str()).map_err(|err| {
            ReasonerError::MalformedOutput {
                reason: format!("cannot export language tag {}: {err}", lang.as_str()),
            }
        }),
        None if lit.value.is_string() => Ok(RdfLiteral::new_simple_literal(lexical)),
        None => Ok(RdfLiteral::new_typed_literal(
            lexical,
            NamedNode::new_unchecked(lit.value.datatype()),
        )),
    }
}

fn term(node: &Node) -> Result<Term, ReasonerError> {
    Ok(match node {
        Node::Iri(iri) => named(iri).into(),
        Node::Blank(id) => blank(*id).into(),
        Node::Literal(lit) => literal(lit)?.into(),
    })
}

/// Renders one statement as an `oxrdf` triple.
fn triple(statement: &Statement) -> Result<Triple, ReasonerError> {
    let predicate = named(&statement.predicate);
    let object = term(&statement.object)?;
    match &statement.subject {
        Node::Iri(iri) => Ok(Triple::new(named(iri), predicate, object)),
        Node::Blank(id) => Ok(Triple::new(blank(*id), predicate, object)),
        Node::Literal(lit) => Err(ReasonerError::MalformedOutput {
            reason: format!("literal subject {lit} cannot be exported"),
        }),
    }
}

/// Renders statements as an N-Triples document, one line per statement.
pub fn to_ntriples<'a>(
    statements: impl IntoIterator<Item = &'a Statement>,
) -> Result<String, ReasonerError> {
    let mut out = String::new();
    for statement in statements {
        out.push_str(&format!("{} .\n", triple(statement)?));
    }
    Ok(out)
}
