//! Comparison operators
//!
//! Implements: `=`, `!=`, `<`, `>`, `<=`, `>=` and logical `!`.
//!
//! `=` and `<` carry the typed overloads. `>` is `<` with its arguments swapped and
//! `<=` / `>=` combine `<` with `=`, so every comparison shares one set of typed rules.

use crate::context::FunctionContext;
use crate::error::{EvalError, EvalResult};
use crate::operators::datetime::instant;
use crate::operators::numeric_pairs;
use crate::overloads::{OverloadBuilder, bool_term};
use crate::registry::{Arity, FunctionRegistry};
use crate::special::ebv;
use rust_decimal::Decimal;
use sparql_expr_types::vocab::{rdf, xsd};
use sparql_expr_types::{
    DurationValue, Literal, LiteralValue, Term, numeric_to_decimal, numeric_to_f64,
};
use std::cmp::Ordering;

/// Three-way comparison of two numeric literals in the widest of their value spaces
pub(crate) fn compare_numeric(a: &Literal, b: &Literal) -> Option<Ordering> {
    match (&a.value, &b.value) {
        (LiteralValue::Integer(x), LiteralValue::Integer(y)) => Some(x.cmp(y)),
        (LiteralValue::Float(_) | LiteralValue::Double(_), _)
        | (_, LiteralValue::Float(_) | LiteralValue::Double(_)) => {
            numeric_to_f64(&a.value)?.partial_cmp(&numeric_to_f64(&b.value)?)
        }
        _ => match (numeric_to_decimal(&a.value), numeric_to_decimal(&b.value)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            // integers beyond the decimal range
            _ => numeric_to_f64(&a.value)?.partial_cmp(&numeric_to_f64(&b.value)?),
        },
    }
}

fn duration_of(literal: &Literal) -> Option<&DurationValue> {
    match &literal.value {
        LiteralValue::Duration(d)
        | LiteralValue::DayTimeDuration(d)
        | LiteralValue::YearMonthDuration(d) => Some(d),
        _ => None,
    }
}

fn compare_instants(a: &Literal, b: &Literal, ctx: &FunctionContext<'_>) -> Option<Ordering> {
    let tz = ctx.shared.default_timezone;
    Some(instant(a, tz)?.cmp(&instant(b, tz)?))
}

fn compare_booleans(a: &Literal, b: &Literal) -> Option<Ordering> {
    match (&a.value, &b.value) {
        (LiteralValue::Boolean(x), LiteralValue::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Register `test` on the ordering of every typed comparison pair
fn typed_comparisons(
    builder: OverloadBuilder,
    test: fn(Ordering) -> bool,
) -> OverloadBuilder {
    let name = builder.name().to_string();
    let decide = move |ordering: Option<Ordering>, a: &Literal, b: &Literal| -> EvalResult<Term> {
        match ordering {
            Some(ordering) => Ok(bool_term(test(ordering))),
            // NaN compares false under every operator
            None if a.is_numeric() && b.is_numeric() => Ok(bool_term(false)),
            None => Err(EvalError::invalid_argument_types(
                &name,
                [&Term::from(a.clone()), &Term::from(b.clone())],
            )),
        }
    };

    let numeric = decide.clone();
    let string = decide.clone();
    let boolean = decide.clone();
    let temporal = decide;

    builder
        .on_binary_each(numeric_pairs(), move |a, b, _| numeric(compare_numeric(a, b), a, b))
        .on_binary(xsd::STRING, xsd::STRING, move |a, b, _| {
            string(a.as_str().zip(b.as_str()).map(|(x, y)| x.cmp(y)), a, b)
        })
        .on_binary(xsd::BOOLEAN, xsd::BOOLEAN, move |a, b, _| boolean(compare_booleans(a, b), a, b))
        .on_binary_each(
            &[
                (xsd::DATE_TIME, xsd::DATE_TIME),
                (xsd::DATE, xsd::DATE),
                (xsd::TIME, xsd::TIME),
            ],
            move |a, b, ctx| temporal(compare_instants(a, b, ctx), a, b),
        )
}

fn duration_months(duration: &DurationValue) -> EvalResult<i64> {
    duration
        .to_months()
        .ok_or_else(|| EvalError::overflow("duration comparison"))
}

fn duration_seconds(duration: &DurationValue) -> EvalResult<Decimal> {
    duration
        .to_seconds()
        .ok_or_else(|| EvalError::overflow("duration comparison"))
}

fn register_equal(registry: &mut FunctionRegistry) {
    let builder = typed_comparisons(OverloadBuilder::new("=", Arity::Exact(2)), Ordering::is_eq)
        .on_binary_each(
            &[(xsd::STRING, rdf::LANG_STRING), (rdf::LANG_STRING, xsd::STRING)],
            |_, _, _| Ok(bool_term(false)),
        )
        .on_binary(rdf::LANG_STRING, rdf::LANG_STRING, |a, b, _| {
            Ok(bool_term(a.as_str() == b.as_str() && a.language == b.language))
        })
        .on_binary(xsd::DURATION, xsd::DURATION, |a, b, _| {
            let equal = match (duration_of(a), duration_of(b)) {
                (Some(x), Some(y)) => {
                    duration_months(x)? == duration_months(y)? && duration_seconds(x)? == duration_seconds(y)?
                }
                _ => false,
            };
            Ok(bool_term(equal))
        })
        .on_term2(|a, b, _| {
            if a.same_term(b) {
                return Ok(bool_term(true));
            }
            if let (Term::Literal(_), Term::Literal(_)) = (a, b) {
                return Err(EvalError::RdfEqualType {
                    left: a.to_string(),
                    right: b.to_string(),
                });
            }
            Ok(bool_term(false))
        });
    registry.register_operator(builder.build());
}

fn register_less_than(registry: &mut FunctionRegistry) {
    let builder = typed_comparisons(OverloadBuilder::new("<", Arity::Exact(2)), Ordering::is_lt)
        .on_binary(rdf::LANG_STRING, rdf::LANG_STRING, |a, b, _| {
            let left = (a.as_str(), a.language.as_deref());
            let right = (b.as_str(), b.language.as_deref());
            Ok(bool_term(left < right))
        })
        .on_binary(xsd::YEAR_MONTH_DURATION, xsd::YEAR_MONTH_DURATION, |a, b, _| {
            let less = match (duration_of(a), duration_of(b)) {
                (Some(x), Some(y)) => duration_months(x)? < duration_months(y)?,
                _ => false,
            };
            Ok(bool_term(less))
        })
        .on_binary(xsd::DAY_TIME_DURATION, xsd::DAY_TIME_DURATION, |a, b, _| {
            let less = match (duration_of(a), duration_of(b)) {
                (Some(x), Some(y)) => duration_seconds(x)? < duration_seconds(y)?,
                _ => false,
            };
            Ok(bool_term(less))
        });
    registry.register_operator(builder.build());
}

fn less_or_equal(a: &Term, b: &Term, ctx: &FunctionContext<'_>) -> EvalResult<bool> {
    let args = [a.clone(), b.clone()];
    Ok(ctx.functions.test("<", &args, ctx)? || ctx.functions.test("=", &args, ctx)?)
}

pub fn register(registry: &mut FunctionRegistry) {
    register_equal(registry);
    register_less_than(registry);

    registry.register_operator(
        OverloadBuilder::new("!=", Arity::Exact(2))
            .on_term2(|a, b, ctx| {
                let equal = ctx.functions.test("=", &[a.clone(), b.clone()], ctx)?;
                Ok(bool_term(!equal))
            })
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new(">", Arity::Exact(2))
            .on_term2(|a, b, ctx| Ok(bool_term(ctx.functions.test("<", &[b.clone(), a.clone()], ctx)?)))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("<=", Arity::Exact(2))
            .on_term2(|a, b, ctx| Ok(bool_term(less_or_equal(a, b, ctx)?)))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new(">=", Arity::Exact(2))
            .on_term2(|a, b, ctx| Ok(bool_term(less_or_equal(b, a, ctx)?)))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("!", Arity::Exact(1))
            .on_term1(|a, _| Ok(bool_term(!ebv(a)?)))
            .build(),
    );
}
