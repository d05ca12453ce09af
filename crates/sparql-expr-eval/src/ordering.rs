//! Total order over terms for sorting
//!
//! Unbound values sort first, then terms by kind: variables, blank nodes, named nodes,
//! literals, quads and the default graph. Literals use the typed `=`, `>` and `<`
//! operators; pairs those operators cannot order fall back to comparing the datatype
//! IRI and then the string value, so ordering never fails.

use crate::context::FunctionContext;
use sparql_expr_types::{Literal, Term};
use std::cmp::Ordering;

/// Ascending order of two possibly unbound terms
pub fn order_terms(left: Option<&Term>, right: Option<&Term>, ctx: &FunctionContext<'_>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => order_bound(left, right, ctx),
    }
}

/// Descending order of two possibly unbound terms
pub fn order_terms_desc(left: Option<&Term>, right: Option<&Term>, ctx: &FunctionContext<'_>) -> Ordering {
    order_terms(left, right, ctx).reverse()
}

fn order_bound(left: &Term, right: &Term, ctx: &FunctionContext<'_>) -> Ordering {
    left.kind().cmp(&right.kind()).then_with(|| match (left, right) {
        (Term::Literal(_), Term::Literal(_)) => order_literals(left, right, ctx),
        (Term::Quad(a), Term::Quad(b)) => order_bound(&a.subject, &b.subject, ctx)
            .then_with(|| order_bound(&a.predicate, &b.predicate, ctx))
            .then_with(|| order_bound(&a.object, &b.object, ctx))
            .then_with(|| order_bound(&a.graph, &b.graph, ctx)),
        _ => left.str().cmp(&right.str()),
    })
}

fn order_literals(left: &Term, right: &Term, ctx: &FunctionContext<'_>) -> Ordering {
    typed_order(left, right, ctx).unwrap_or_else(|| match (left.as_literal(), right.as_literal()) {
        (Some(a), Some(b)) => fallback_order(a, b),
        _ => Ordering::Equal,
    })
}

fn typed_order(left: &Term, right: &Term, ctx: &FunctionContext<'_>) -> Option<Ordering> {
    let args = [left.clone(), right.clone()];
    let test = |operator: &str| ctx.functions.test(operator, &args, ctx).ok();
    if test("=")? {
        Some(Ordering::Equal)
    } else if test(">")? {
        Some(Ordering::Greater)
    } else if test("<")? {
        Some(Ordering::Less)
    } else {
        // NaN against anything
        None
    }
}

fn fallback_order(left: &Literal, right: &Literal) -> Ordering {
    left.datatype
        .cmp(&right.datatype)
        .then_with(|| left.str().cmp(&right.str()))
}
