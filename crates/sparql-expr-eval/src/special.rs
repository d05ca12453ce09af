//! Special forms
//!
//! Special forms receive their arguments unevaluated, so they can short-circuit and
//! recover from expression errors. The evaluators drive argument evaluation; this
//! module holds the evaluation-independent parts both evaluators share: the catalog
//! entries, error interception and the three-valued combination rules.
//!
//! Only expression errors (see [`EvalError::is_expression_error`]) are ever caught.
//! Definition and extension errors always propagate.

use crate::error::{ErrorList, EvalError, EvalResult};
use crate::expression::SpecialForm;
use crate::registry::{Arity, FunctionRegistry};
use sparql_expr_types::{Literal, LiteralValue, Term};

/// Effective boolean value of a term
pub fn ebv(term: &Term) -> EvalResult<bool> {
    match term {
        Term::Literal(literal) => Ok(literal.coerce_ebv()?),
        other => Err(EvalError::EbvCoercion {
            term: other.to_string(),
        }),
    }
}

/// Separate recoverable expression errors from fatal ones
///
/// The outer result carries fatal errors, the inner one the value or the expression
/// error to be handled by the form.
pub fn catch<T>(result: EvalResult<T>) -> EvalResult<EvalResult<T>> {
    match result {
        Err(error) if !error.is_expression_error() => Err(error),
        other => Ok(other),
    }
}

/// Three-valued OR of two evaluated operands
///
/// A true operand wins over an error on the other side. With no true operand, the left
/// error is reported before the right one.
pub fn combine_or(left: EvalResult<bool>, right: EvalResult<bool>) -> EvalResult<bool> {
    match (left, right) {
        (Ok(true), _) | (_, Ok(true)) => Ok(true),
        (Ok(false), Ok(false)) => Ok(false),
        (Err(error), _) | (Ok(false), Err(error)) => Err(error),
    }
}

/// Three-valued AND of two evaluated operands
///
/// A false operand wins over an error on the other side.
pub fn combine_and(left: EvalResult<bool>, right: EvalResult<bool>) -> EvalResult<bool> {
    match (left, right) {
        (Ok(false), _) | (_, Ok(false)) => Ok(false),
        (Ok(true), Ok(true)) => Ok(true),
        (Err(error), _) | (Ok(true), Err(error)) => Err(error),
    }
}

/// Result of COALESCE once every argument failed
pub fn coalesce_failed(errors: Vec<EvalError>) -> EvalError {
    EvalError::Coalesce {
        errors: ErrorList(errors),
    }
}

/// Result of IN once no argument matched
pub fn in_result(errors: Vec<EvalError>) -> EvalResult<bool> {
    if errors.is_empty() {
        Ok(false)
    } else {
        Err(EvalError::InError {
            errors: ErrorList(errors),
        })
    }
}

/// CONCAT of evaluated arguments
///
/// Every argument must be a string or language-tagged string. The result keeps the
/// language tag when all arguments share it and is a plain string otherwise.
pub fn concat(args: &[Term]) -> EvalResult<Term> {
    let mut value = String::new();
    let mut language: Option<Option<&str>> = None;
    for arg in args {
        let literal = arg
            .as_literal()
            .filter(|l| matches!(l.value, LiteralValue::String(_) | LiteralValue::LangString(_)))
            .ok_or_else(|| EvalError::invalid_argument_types("concat", args))?;
        value.push_str(literal.as_str().unwrap_or_default());
        let tag = literal.language.as_deref();
        language = match language {
            None => Some(tag),
            Some(previous) if previous == tag => Some(previous),
            Some(_) => Some(None),
        };
    }
    Ok(match language.flatten() {
        Some(tag) => Term::from(Literal::lang_string(value, tag)),
        None => Term::from(Literal::string(value)),
    })
}

/// Seed of a BNODE call: absent, or the value of a plain string
pub fn bnode_seed(arg: Option<&Term>) -> EvalResult<Option<String>> {
    match arg {
        None => Ok(None),
        Some(Term::Literal(literal)) if matches!(literal.value, LiteralValue::String(_)) => {
            Ok(Some(literal.str()))
        }
        Some(other) => Err(EvalError::invalid_argument_types("bnode", [other])),
    }
}

/// Register every special form with its arity
pub fn register_special_forms(registry: &mut FunctionRegistry) {
    let forms = [
        (SpecialForm::Bound, Arity::Exact(1)),
        (SpecialForm::If, Arity::Exact(3)),
        (SpecialForm::Coalesce, Arity::AtLeast(1)),
        (SpecialForm::LogicalOr, Arity::Exact(2)),
        (SpecialForm::LogicalAnd, Arity::Exact(2)),
        (SpecialForm::SameTerm, Arity::Exact(2)),
        (SpecialForm::In, Arity::AtLeast(1)),
        (SpecialForm::NotIn, Arity::AtLeast(1)),
        (SpecialForm::Concat, Arity::AtLeast(0)),
        (SpecialForm::Bnode, Arity::Between(0, 1)),
    ];
    for (form, arity) in forms {
        registry.register_special(form, arity);
    }
}
