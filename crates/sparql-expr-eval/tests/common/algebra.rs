//! Algebra constructors and evaluation shortcuts

use sparql_expr_eval::{Algebra, Bindings, EvalResult, EvaluatorBuilder};
use sparql_expr_types::{Literal, Term};
use std::str::FromStr;

pub fn int(value: i64) -> Algebra {
    Algebra::term(Literal::integer(value))
}

pub fn decimal(value: &str) -> Algebra {
    let parsed = rust_decimal::Decimal::from_str(value).expect("decimal literal");
    Algebra::term(Literal::decimal(parsed))
}

pub fn double(value: f64) -> Algebra {
    Algebra::term(Literal::double(value))
}

pub fn boolean(value: bool) -> Algebra {
    Algebra::term(Literal::boolean(value))
}

pub fn string(value: &str) -> Algebra {
    Algebra::term(Literal::string(value))
}

pub fn lang(value: &str, tag: &str) -> Algebra {
    Algebra::term(Literal::lang_string(value, tag))
}

/// Raw literal, typed by the builder like a literal read from a store
pub fn typed(lexical: &str, datatype: &str) -> Algebra {
    Algebra::term(Literal::other(lexical, datatype))
}

pub fn iri(value: &str) -> Algebra {
    Algebra::term(Term::named_node(value))
}

pub fn var(name: &str) -> Algebra {
    Algebra::variable(name)
}

pub fn op(operator: &str, args: Vec<Algebra>) -> Algebra {
    Algebra::operator(operator, args)
}

pub fn named(iri: &str, args: Vec<Algebra>) -> Algebra {
    Algebra::named(iri, args)
}

/// Evaluate with a default builder and no bindings
pub fn eval(algebra: &Algebra) -> EvalResult<Term> {
    eval_with(EvaluatorBuilder::new(), algebra, &Bindings::new())
}

pub fn eval_with(builder: EvaluatorBuilder, algebra: &Algebra, bindings: &Bindings) -> EvalResult<Term> {
    builder.build_sync(algebra)?.evaluate(bindings)
}

pub async fn eval_async(algebra: &Algebra) -> EvalResult<Term> {
    eval_async_with(EvaluatorBuilder::new(), algebra, &Bindings::new()).await
}

pub async fn eval_async_with(builder: EvaluatorBuilder, algebra: &Algebra, bindings: &Bindings) -> EvalResult<Term> {
    builder.build_async(algebra)?.evaluate(bindings).await
}
