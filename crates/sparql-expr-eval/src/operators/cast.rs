//! XSD constructor casts
//!
//! Named functions called by datatype IRI. Casts follow the XPath casting table:
//! numerics convert between each other and to and from boolean, any literal casts to
//! xsd:string, and a string casts to any target by parsing its lexical form. A lexical
//! form outside the target value space is a cast error.

use crate::error::{EvalError, EvalResult};
use crate::overloads::OverloadBuilder;
use crate::registry::{Arity, FunctionRegistry};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sparql_expr_types::lexical::{
    parse_boolean, parse_date, parse_date_time, parse_day_time_duration, parse_decimal,
    parse_duration, parse_float, parse_integer, parse_time, parse_year_month_duration,
};
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{
    DurationValue, Literal, LiteralValue, Term, TermKind, TypeAlias, numeric_to_decimal,
    numeric_to_f64,
};

fn cast_failed(literal: &Literal, target: &str) -> EvalError {
    EvalError::cast_error(literal, target)
}

/// Cast the string form of `literal` with `parse`
fn from_lexical<T>(
    literal: &Literal,
    target: &str,
    parse: impl Fn(&str) -> Option<T>,
    build: impl Fn(T) -> Literal,
) -> EvalResult<Term> {
    parse(literal.str().trim())
        .map(|value| Term::from(build(value)))
        .ok_or_else(|| cast_failed(literal, target))
}

fn boolean_as_number(literal: &Literal) -> Option<i128> {
    match literal.value {
        LiteralValue::Boolean(b) => Some(i128::from(b)),
        _ => None,
    }
}

fn to_integer(literal: &Literal) -> EvalResult<Term> {
    let value = match &literal.value {
        LiteralValue::Integer(i) => Some(*i),
        LiteralValue::Decimal(d) => d.trunc().to_i128(),
        LiteralValue::Float(f) | LiteralValue::Double(f) => {
            let whole = f.trunc();
            (whole >= i128::MIN as f64 && whole < i128::MAX as f64).then_some(whole as i128)
        }
        _ => boolean_as_number(literal),
    };
    value
        .map(|i| Term::from(Literal::integer(i)))
        .ok_or_else(|| cast_failed(literal, xsd::INTEGER))
}

fn to_decimal(literal: &Literal) -> EvalResult<Term> {
    let value = match &literal.value {
        LiteralValue::Float(f) | LiteralValue::Double(f) => Decimal::try_from(*f).ok(),
        LiteralValue::Boolean(b) => Some(Decimal::from(i64::from(*b))),
        other => numeric_to_decimal(other),
    };
    value
        .map(|d| Term::from(Literal::decimal(d.normalize())))
        .ok_or_else(|| cast_failed(literal, xsd::DECIMAL))
}

fn to_f64(literal: &Literal, target: &str) -> EvalResult<f64> {
    match literal.value {
        LiteralValue::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        ref other => numeric_to_f64(other).ok_or_else(|| cast_failed(literal, target)),
    }
}

fn to_boolean(literal: &Literal) -> EvalResult<Term> {
    let value = match &literal.value {
        LiteralValue::Boolean(b) => *b,
        LiteralValue::Integer(i) => *i != 0,
        LiteralValue::Float(f) | LiteralValue::Double(f) => *f != 0.0 && !f.is_nan(),
        other => !numeric_to_decimal(other)
            .ok_or_else(|| cast_failed(literal, xsd::BOOLEAN))?
            .is_zero(),
    };
    Ok(Term::from(Literal::boolean(value)))
}

fn duration_of(literal: &Literal) -> Option<&DurationValue> {
    match &literal.value {
        LiteralValue::Duration(d)
        | LiteralValue::DayTimeDuration(d)
        | LiteralValue::YearMonthDuration(d) => Some(d),
        _ => None,
    }
}

/// Overloads shared by every numeric target: numerics, booleans and strings
fn numeric_cast<F>(target: &'static str, parse: fn(&str) -> Option<Literal>, convert: F) -> OverloadBuilder
where
    F: Fn(&Literal) -> EvalResult<Term> + Send + Sync + Clone + 'static,
{
    let from_boolean = convert.clone();
    OverloadBuilder::new(target, Arity::Exact(1))
        .on_unary(TypeAlias::Numeric, move |a, _| convert(a))
        .on_unary(xsd::BOOLEAN, move |a, _| from_boolean(a))
        .on_unary(xsd::STRING, move |a, _| from_lexical(a, target, parse, |l| l))
}

fn register_numeric_casts(registry: &mut FunctionRegistry) {
    registry.register_named(
        numeric_cast(xsd::INTEGER, |s| parse_integer(s).map(Literal::integer), to_integer).build(),
    );
    registry.register_named(
        numeric_cast(xsd::DECIMAL, |s| parse_decimal(s).map(Literal::decimal), to_decimal).build(),
    );
    registry.register_named(
        numeric_cast(xsd::FLOAT, |s| parse_float(s).map(Literal::float), |a| {
            Ok(Term::from(Literal::float(to_f64(a, xsd::FLOAT)?)))
        })
        .build(),
    );
    registry.register_named(
        numeric_cast(xsd::DOUBLE, |s| parse_float(s).map(Literal::double), |a| {
            Ok(Term::from(Literal::double(to_f64(a, xsd::DOUBLE)?)))
        })
        .build(),
    );
    registry.register_named(
        OverloadBuilder::new(xsd::BOOLEAN, Arity::Exact(1))
            .on_unary(TypeAlias::Numeric, |a, _| to_boolean(a))
            .on_unary(xsd::BOOLEAN, |a, _| to_boolean(a))
            .on_unary(xsd::STRING, |a, _| from_lexical(a, xsd::BOOLEAN, parse_boolean, Literal::boolean))
            .build(),
    );
}

fn register_temporal_casts(registry: &mut FunctionRegistry) {
    registry.register_named(
        OverloadBuilder::new(xsd::DATE_TIME, Arity::Exact(1))
            .on_unary(xsd::DATE_TIME, |a, _| match &a.value {
                LiteralValue::DateTime(dt) => Ok(Term::from(Literal::date_time(dt.clone()))),
                _ => Err(cast_failed(a, xsd::DATE_TIME)),
            })
            .on_unary(xsd::DATE, |a, _| match &a.value {
                LiteralValue::Date(d) => Ok(Term::from(Literal::date_time(d.to_date_time()))),
                _ => Err(cast_failed(a, xsd::DATE_TIME)),
            })
            .on_unary(xsd::STRING, |a, _| {
                from_lexical(a, xsd::DATE_TIME, |s| parse_date_time(s).ok(), Literal::date_time)
            })
            .build(),
    );
    registry.register_named(
        OverloadBuilder::new(xsd::DATE, Arity::Exact(1))
            .on_unary(xsd::DATE, |a, _| match &a.value {
                LiteralValue::Date(d) => Ok(Term::from(Literal::date(d.clone()))),
                _ => Err(cast_failed(a, xsd::DATE)),
            })
            .on_unary(xsd::DATE_TIME, |a, _| match &a.value {
                LiteralValue::DateTime(dt) => Ok(Term::from(Literal::date(dt.date()))),
                _ => Err(cast_failed(a, xsd::DATE)),
            })
            .on_unary(xsd::STRING, |a, _| from_lexical(a, xsd::DATE, |s| parse_date(s).ok(), Literal::date))
            .build(),
    );
    registry.register_named(
        OverloadBuilder::new(xsd::TIME, Arity::Exact(1))
            .on_unary(xsd::TIME, |a, _| match &a.value {
                LiteralValue::Time(t) => Ok(Term::from(Literal::time(t.clone()))),
                _ => Err(cast_failed(a, xsd::TIME)),
            })
            .on_unary(xsd::DATE_TIME, |a, _| match &a.value {
                LiteralValue::DateTime(dt) => Ok(Term::from(Literal::time(dt.time()))),
                _ => Err(cast_failed(a, xsd::TIME)),
            })
            .on_unary(xsd::STRING, |a, _| from_lexical(a, xsd::TIME, |s| parse_time(s).ok(), Literal::time))
            .build(),
    );

    registry.register_named(
        OverloadBuilder::new(xsd::DURATION, Arity::Exact(1))
            .on_unary(xsd::DURATION, |a, _| {
                duration_of(a)
                    .map(|d| Term::from(Literal::duration(d.clone())))
                    .ok_or_else(|| cast_failed(a, xsd::DURATION))
            })
            .on_unary(xsd::STRING, |a, _| {
                from_lexical(a, xsd::DURATION, |s| parse_duration(s).ok(), Literal::duration)
            })
            .build(),
    );
    registry.register_named(
        OverloadBuilder::new(xsd::DAY_TIME_DURATION, Arity::Exact(1))
            .on_unary(xsd::DURATION, |a, _| {
                duration_of(a)
                    .and_then(DurationValue::day_time_part)
                    .map(|d| Term::from(Literal::day_time_duration(d)))
                    .ok_or_else(|| cast_failed(a, xsd::DAY_TIME_DURATION))
            })
            .on_unary(xsd::STRING, |a, _| {
                from_lexical(
                    a,
                    xsd::DAY_TIME_DURATION,
                    |s| parse_day_time_duration(s).ok(),
                    Literal::day_time_duration,
                )
            })
            .build(),
    );
    registry.register_named(
        OverloadBuilder::new(xsd::YEAR_MONTH_DURATION, Arity::Exact(1))
            .on_unary(xsd::DURATION, |a, _| {
                duration_of(a)
                    .and_then(DurationValue::year_month_part)
                    .map(|d| Term::from(Literal::year_month_duration(d)))
                    .ok_or_else(|| cast_failed(a, xsd::YEAR_MONTH_DURATION))
            })
            .on_unary(xsd::STRING, |a, _| {
                from_lexical(
                    a,
                    xsd::YEAR_MONTH_DURATION,
                    |s| parse_year_month_duration(s).ok(),
                    Literal::year_month_duration,
                )
            })
            .build(),
    );
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_named(
        OverloadBuilder::new(xsd::STRING, Arity::Exact(1))
            .on_unary(TermKind::Literal, |a, _| {
                if a.is_non_lexical() {
                    return Err(cast_failed(a, xsd::STRING));
                }
                Ok(Term::from(Literal::string(a.str())))
            })
            .on_term1(|a, _| match a {
                Term::NamedNode(iri) => Ok(Term::from(Literal::string(iri.as_str()))),
                other => Err(EvalError::invalid_argument_types(xsd::STRING, [other])),
            })
            .build(),
    );
    register_numeric_casts(registry);
    register_temporal_casts(registry);
}
