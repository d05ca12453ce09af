//! RDF terms

use crate::value::Literal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a term, used as the dispatch key for non-literal arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TermKind {
    Variable,
    BlankNode,
    NamedNode,
    Literal,
    Quad,
    DefaultGraph,
}

impl TermKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::BlankNode => "blankNode",
            Self::NamedNode => "namedNode",
            Self::Literal => "literal",
            Self::Quad => "quad",
            Self::DefaultGraph => "defaultGraph",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An RDF-like value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "termType", content = "value")]
pub enum Term {
    NamedNode(String),
    BlankNode(String),
    Literal(Literal),
    Quad(Box<Quad>),
    DefaultGraph,
    Variable(String),
}

/// A quoted triple in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Term,
}

impl Term {
    pub fn named_node(iri: impl Into<String>) -> Self {
        Self::NamedNode(iri.into())
    }

    pub fn blank_node(id: impl Into<String>) -> Self {
        Self::BlankNode(id.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn quad(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Self::Quad(Box::new(Quad {
            subject,
            predicate,
            object,
            graph,
        }))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Self::NamedNode(_) => TermKind::NamedNode,
            Self::BlankNode(_) => TermKind::BlankNode,
            Self::Literal(_) => TermKind::Literal,
            Self::Quad(_) => TermKind::Quad,
            Self::DefaultGraph => TermKind::DefaultGraph,
            Self::Variable(_) => TermKind::Variable,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// String value as returned by `STR()`
    pub fn str(&self) -> String {
        match self {
            Self::NamedNode(iri) => iri.clone(),
            Self::BlankNode(id) | Self::Variable(id) => id.clone(),
            Self::Literal(literal) => literal.str(),
            Self::Quad(quad) => quad.to_string(),
            Self::DefaultGraph => String::new(),
        }
    }

    /// Exact term identity, without any value-space interpretation
    pub fn same_term(&self, other: &Term) -> bool {
        self == other
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(iri) => write!(f, "<{}>", iri),
            Self::BlankNode(id) => write!(f, "_:{}", id),
            Self::Literal(literal) => write!(f, "{}", literal),
            Self::Quad(quad) => write!(f, "{}", quad),
            Self::DefaultGraph => write!(f, "DEFAULT"),
            Self::Variable(name) => write!(f, "?{}", name),
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<< {} {} {}", self.subject, self.predicate, self.object)?;
        if self.graph != Term::DefaultGraph {
            write!(f, " {}", self.graph)?;
        }
        write!(f, " >>")
    }
}
