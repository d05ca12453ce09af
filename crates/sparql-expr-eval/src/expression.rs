//! Expression trees
//!
//! [`Algebra`] is the shape callers hand in. [`Expression`] is the resolved tree the
//! evaluators walk: every operator and named function is already bound to its
//! implementation and its arity has been checked, so evaluation never looks a name up.

use crate::context::{AsyncExtensionFn, ExtensionFn};
use crate::registry::RegularFunction;
use sparql_expr_types::Term;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque sub-pattern forwarded to the existence capability
#[derive(Clone)]
pub struct Pattern {
    pub label: String,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl Pattern {
    pub fn new(label: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        Self {
            label: label.into(),
            payload: Arc::new(payload),
        }
    }

    /// Pattern carrying only a label
    pub fn labelled(label: impl Into<String>) -> Self {
        Self::new(label, ())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.label).finish()
    }
}

/// Expression tree as supplied by the caller
#[derive(Debug, Clone)]
pub enum Algebra {
    Term(Term),
    Variable(String),
    Operator {
        operator: String,
        args: Vec<Algebra>,
    },
    Named {
        iri: String,
        args: Vec<Algebra>,
    },
    Existence {
        not: bool,
        input: Pattern,
    },
    Aggregate {
        aggregator: String,
        distinct: bool,
        separator: Option<String>,
        /// `None` for the wildcard form
        expression: Option<Box<Algebra>>,
    },
}

impl Algebra {
    pub fn term(term: impl Into<Term>) -> Self {
        Self::Term(term.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn operator(operator: impl Into<String>, args: Vec<Algebra>) -> Self {
        Self::Operator {
            operator: operator.into(),
            args,
        }
    }

    pub fn named(iri: impl Into<String>, args: Vec<Algebra>) -> Self {
        Self::Named {
            iri: iri.into(),
            args,
        }
    }

    pub fn aggregate(aggregator: impl Into<String>, distinct: bool, expression: Option<Algebra>) -> Self {
        Self::Aggregate {
            aggregator: aggregator.into(),
            distinct,
            separator: None,
            expression: expression.map(Box::new),
        }
    }
}

/// Control-flow forms that evaluate their own arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Bound,
    If,
    Coalesce,
    LogicalOr,
    LogicalAnd,
    SameTerm,
    In,
    NotIn,
    Concat,
    Bnode,
}

impl SpecialForm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::If => "if",
            Self::Coalesce => "coalesce",
            Self::LogicalOr => "||",
            Self::LogicalAnd => "&&",
            Self::SameTerm => "sameterm",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Concat => "concat",
            Self::Bnode => "bnode",
        }
    }
}

/// Implementation bound to an extension node
#[derive(Clone)]
pub enum ExtensionFunction {
    Sync(ExtensionFn),
    Async(AsyncExtensionFn),
}

impl fmt::Debug for ExtensionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Sync"),
            Self::Async(_) => write!(f, "Async"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorExpression {
    pub name: String,
    pub args: Vec<Expression>,
    pub function: Arc<RegularFunction>,
}

#[derive(Debug, Clone)]
pub struct SpecialExpression {
    pub form: SpecialForm,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct NamedExpression {
    pub iri: String,
    pub args: Vec<Expression>,
    pub function: Arc<RegularFunction>,
}

#[derive(Debug, Clone)]
pub struct ExtensionExpression {
    pub iri: String,
    pub args: Vec<Expression>,
    pub function: ExtensionFunction,
}

#[derive(Debug, Clone)]
pub struct ExistenceExpression {
    pub not: bool,
    pub pattern: Pattern,
}

#[derive(Debug, Clone)]
pub struct AggregateExpression {
    /// Lowercase aggregator name
    pub aggregator: String,
    pub distinct: bool,
    pub separator: Option<String>,
    /// `None` for the wildcard form
    pub expression: Option<Box<Expression>>,
}

/// Resolved, immutable expression tree
#[derive(Debug, Clone)]
pub enum Expression {
    Term(Term),
    Variable(String),
    Operator(OperatorExpression),
    SpecialOperator(SpecialExpression),
    Named(NamedExpression),
    Extension(ExtensionExpression),
    Existence(ExistenceExpression),
    Aggregate(AggregateExpression),
}

impl Expression {
    /// Short name of the node kind, used in log and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Term(_) => "term",
            Self::Variable(_) => "variable",
            Self::Operator(_) => "operator",
            Self::SpecialOperator(_) => "special operator",
            Self::Named(_) => "named function",
            Self::Extension(_) => "extension function",
            Self::Existence(_) => "existence",
            Self::Aggregate(_) => "aggregate",
        }
    }
}
