//! Date and time functions and arithmetic
//!
//! Implements: NOW, YEAR, MONTH, DAY, HOURS, MINUTES, SECONDS, TIMEZONE, TZ and the
//! temporal overloads of `+` and `-`:
//! - dateTime / date / time plus or minus a duration
//! - the difference of two dateTimes, dates or times as a dayTimeDuration
//! - sums and differences of durations of the same kind

use crate::context::FunctionContext;
use crate::error::{EvalError, EvalResult};
use crate::operators::numeric::ArithmeticOp;
use crate::overloads::OverloadBuilder;
use crate::registry::{Arity, FunctionRegistry};
use rust_decimal::Decimal;
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{
    DateTimeValue, DurationValue, Literal, LiteralValue, Term, TimeZone, add_duration_to_date_time,
    elapsed_duration, to_utc_seconds,
};

/// UTC instant in seconds of a dateTime, date or time literal
pub(crate) fn instant(literal: &Literal, default_timezone: TimeZone) -> Option<Decimal> {
    let date_time = match &literal.value {
        LiteralValue::DateTime(dt) => dt.clone(),
        LiteralValue::Date(d) => d.to_date_time(),
        LiteralValue::Time(t) => t.to_date_time(),
        _ => return None,
    };
    to_utc_seconds(&date_time, default_timezone)
}

fn date_time_of(literal: &Literal) -> Option<DateTimeValue> {
    match &literal.value {
        LiteralValue::DateTime(dt) => Some(dt.clone()),
        LiteralValue::Date(d) => Some(d.to_date_time()),
        LiteralValue::Time(t) => Some(t.to_date_time()),
        _ => None,
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

fn mismatch(name: &str, a: &Literal, b: &Literal) -> EvalError {
    EvalError::invalid_argument_types(name, [&Term::from(a.clone()), &Term::from(b.clone())])
}

/// Shift a dateTime, date or time by a duration, keeping the kind of the first operand
fn shift(op: ArithmeticOp, temporal: &Literal, duration: &Literal) -> EvalResult<Term> {
    let (Some(start), Some(duration)) = (date_time_of(temporal), duration_of(duration)) else {
        return Err(mismatch(op.symbol(), temporal, duration));
    };
    let duration = match op {
        ArithmeticOp::Subtract => duration.negate(),
        _ => duration.clone(),
    };
    let shifted = add_duration_to_date_time(&start, &duration)
        .ok_or_else(|| EvalError::overflow(format!("dateTime {} duration", op.symbol())))?;
    let literal = match temporal.value {
        LiteralValue::Date(_) => Literal::date(shifted.date()),
        LiteralValue::Time(_) => Literal::time(shifted.time()),
        _ => Literal::date_time(shifted),
    };
    Ok(Term::from(literal))
}

fn difference(a: &Literal, b: &Literal, ctx: &FunctionContext<'_>) -> EvalResult<Term> {
    let (Some(first), Some(second)) = (date_time_of(a), date_time_of(b)) else {
        return Err(mismatch("-", a, b));
    };
    let elapsed = elapsed_duration(&first, &second, ctx.shared.default_timezone)
        .ok_or_else(|| EvalError::overflow("dateTime -"))?;
    Ok(Term::from(Literal::day_time_duration(elapsed)))
}

fn combine_durations(op: ArithmeticOp, a: &Literal, b: &Literal) -> EvalResult<Term> {
    let (Some(x), Some(y)) = (duration_of(a), duration_of(b)) else {
        return Err(mismatch(op.symbol(), a, b));
    };
    let subtract = op == ArithmeticOp::Subtract;
    let overflow = || EvalError::overflow(format!("duration {}", op.symbol()));
    let literal = match a.value {
        LiteralValue::YearMonthDuration(_) => {
            let (x, y) = (x.to_months().ok_or_else(overflow)?, y.to_months().ok_or_else(overflow)?);
            let months = if subtract { x.checked_sub(y) } else { x.checked_add(y) };
            Literal::year_month_duration(DurationValue::from_months(months.ok_or_else(overflow)?))
        }
        _ => {
            let (x, y) = (x.to_seconds().ok_or_else(overflow)?, y.to_seconds().ok_or_else(overflow)?);
            let seconds = if subtract { x.checked_sub(y) } else { x.checked_add(y) };
            let duration = seconds.and_then(DurationValue::from_seconds).ok_or_else(overflow)?;
            Literal::day_time_duration(duration)
        }
    };
    Ok(Term::from(literal))
}

/// Register the temporal overloads of `+` (`op` = Add) or `-` (`op` = Subtract)
pub fn arithmetic(builder: OverloadBuilder, op: ArithmeticOp) -> OverloadBuilder {
    let builder = builder
        .on_binary_each(
            &[
                (xsd::DATE_TIME, xsd::DAY_TIME_DURATION),
                (xsd::DATE_TIME, xsd::YEAR_MONTH_DURATION),
                (xsd::DATE, xsd::DAY_TIME_DURATION),
                (xsd::DATE, xsd::YEAR_MONTH_DURATION),
                (xsd::TIME, xsd::DAY_TIME_DURATION),
            ],
            move |a, b, _| shift(op, a, b),
        )
        .on_binary_each(
            &[
                (xsd::DAY_TIME_DURATION, xsd::DAY_TIME_DURATION),
                (xsd::YEAR_MONTH_DURATION, xsd::YEAR_MONTH_DURATION),
            ],
            move |a, b, _| combine_durations(op, a, b),
        );
    match op {
        ArithmeticOp::Subtract => builder.on_binary_each(
            &[
                (xsd::DATE_TIME, xsd::DATE_TIME),
                (xsd::DATE, xsd::DATE),
                (xsd::TIME, xsd::TIME),
            ],
            difference,
        ),
        _ => builder,
    }
}

fn date_time_field(
    registry: &mut FunctionRegistry,
    name: &str,
    field: fn(&DateTimeValue) -> Literal,
) {
    registry.register_operator(
        OverloadBuilder::new(name, Arity::Exact(1))
            .on_unary(xsd::DATE_TIME, move |a, _| match &a.value {
                LiteralValue::DateTime(dt) => Ok(Term::from(field(dt))),
                _ => Err(EvalError::invalid_argument_types("date field", [&Term::from(a.clone())])),
            })
            .build(),
    );
}

fn timezone_of(literal: &Literal) -> Option<TimeZone> {
    match &literal.value {
        LiteralValue::DateTime(dt) => dt.timezone,
        LiteralValue::Date(d) => d.timezone,
        LiteralValue::Time(t) => t.timezone,
        _ => None,
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_operator(
        OverloadBuilder::new("now", Arity::Exact(0))
            .set(&[], |_, ctx| {
                Ok(Term::from(Literal::date_time(DateTimeValue::from(ctx.shared.now))))
            })
            .build(),
    );

    date_time_field(registry, "year", |dt| Literal::integer(dt.year));
    date_time_field(registry, "month", |dt| Literal::integer(i64::from(dt.month)));
    date_time_field(registry, "day", |dt| Literal::integer(i64::from(dt.day)));
    date_time_field(registry, "hours", |dt| Literal::integer(i64::from(dt.hours)));
    date_time_field(registry, "minutes", |dt| Literal::integer(i64::from(dt.minutes)));
    date_time_field(registry, "seconds", |dt| Literal::decimal(dt.seconds.normalize()));

    registry.register_operator(
        OverloadBuilder::new("timezone", Arity::Exact(1))
            .on_unary(xsd::DATE_TIME, |a, _| match timezone_of(a) {
                Some(zone) => Ok(Term::from(Literal::day_time_duration(zone.to_duration()))),
                None => Err(EvalError::MissingTimezone { value: a.str() }),
            })
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("tz", Arity::Exact(1))
            .on_unary(xsd::DATE_TIME, |a, _| {
                let zone = timezone_of(a).map(|zone| zone.to_string()).unwrap_or_default();
                Ok(Term::from(Literal::string(zone)))
            })
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedContext;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sparql_expr_types::TermTransformer;

    fn apply_with(shared: &SharedContext, name: &str, args: &[Term]) -> EvalResult<Term> {
        let registry = FunctionRegistry::with_standard_functions();
        let ctx = FunctionContext {
            shared,
            functions: &registry,
        };
        registry.apply(name, args, &ctx)
    }

    fn apply(name: &str, args: &[Term]) -> EvalResult<Term> {
        let mut shared = SharedContext::new();
        shared.default_timezone = TimeZone::UTC;
        apply_with(&shared, name, args)
    }

    fn lit(lexical: &str, datatype: &str) -> Term {
        let shared = SharedContext::new();
        Term::from(TermTransformer::new(&shared.lattice).transform_literal(lexical, datatype, None))
    }

    #[rstest]
    #[case("+", "2024-01-31T10:00:00Z", xsd::DATE_TIME, "P1M", xsd::YEAR_MONTH_DURATION, "2024-02-29T10:00:00Z")]
    #[case("+", "2024-12-31T23:00:00Z", xsd::DATE_TIME, "PT2H", xsd::DAY_TIME_DURATION, "2025-01-01T01:00:00Z")]
    #[case("-", "2024-03-01", xsd::DATE, "P1D", xsd::DAY_TIME_DURATION, "2024-02-29")]
    #[case("+", "23:30:00", xsd::TIME, "PT1H", xsd::DAY_TIME_DURATION, "00:30:00")]
    #[case("-", "2024-01-02T00:00:00Z", xsd::DATE_TIME, "2024-01-01T12:00:00Z", xsd::DATE_TIME, "PT12H")]
    #[case("-", "2000-01-01", xsd::DATE, "2000-01-03", xsd::DATE, "-P2D")]
    #[case("+", "P1DT1H", xsd::DAY_TIME_DURATION, "PT23H", xsd::DAY_TIME_DURATION, "P2D")]
    #[case("-", "P1Y", xsd::YEAR_MONTH_DURATION, "P1M", xsd::YEAR_MONTH_DURATION, "P11M")]
    fn test_temporal_arithmetic(
        #[case] op: &str,
        #[case] a: &str,
        #[case] a_type: &str,
        #[case] b: &str,
        #[case] b_type: &str,
        #[case] expected: &str,
    ) {
        let result = apply(op, &[lit(a, a_type), lit(b, b_type)]).unwrap();
        assert_eq!(result.str(), expected);
    }

    #[test]
    fn test_large_durations() {
        let start = lit("2000-01-01T00:00:00Z", xsd::DATE_TIME);
        let days = lit("P999999999999999D", xsd::DAY_TIME_DURATION);
        let result = apply("+", &[start.clone(), days.clone()]).unwrap();
        assert_eq!(result.str(), "2737907008988-07-03T00:00:00Z");
        assert_eq!(apply("+", &[days.clone(), days]).unwrap().str(), "P1999999999999998D");

        let years = lit("P4611686018427387903Y", xsd::YEAR_MONTH_DURATION);
        let err = apply("+", &[start, years.clone()]).unwrap_err();
        assert!(matches!(err, EvalError::Overflow { .. }));
        let err = apply("-", &[years.clone(), years]).unwrap_err();
        assert!(matches!(err, EvalError::Overflow { .. }));
    }

    #[test]
    fn test_date_plus_date_is_rejected() {
        let date = lit("2024-01-01", xsd::DATE);
        let err = apply("+", &[date.clone(), date]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgumentTypes { .. }));
    }

    #[test]
    fn test_fields() {
        let dt = lit("2011-01-10T14:45:13.815-05:00", xsd::DATE_TIME);
        assert_eq!(apply("year", &[dt.clone()]).unwrap().str(), "2011");
        assert_eq!(apply("month", &[dt.clone()]).unwrap().str(), "1");
        assert_eq!(apply("hours", &[dt.clone()]).unwrap().str(), "14");
        assert_eq!(apply("seconds", &[dt.clone()]).unwrap().str(), "13.815");
        assert_eq!(apply("timezone", &[dt.clone()]).unwrap().str(), "-PT5H");
        assert_eq!(apply("tz", &[dt]).unwrap().str(), "-05:00");
    }

    #[test]
    fn test_missing_timezone() {
        let dt = lit("2011-01-10T14:45:13", xsd::DATE_TIME);
        assert!(matches!(
            apply("timezone", &[dt.clone()]),
            Err(EvalError::MissingTimezone { .. })
        ));
        assert_eq!(apply("tz", &[dt]).unwrap().str(), "");
        let utc = lit("2011-01-10T14:45:13Z", xsd::DATE_TIME);
        assert_eq!(apply("timezone", &[utc.clone()]).unwrap().str(), "PT0S");
        assert_eq!(apply("tz", &[utc]).unwrap().str(), "Z");
    }

    #[test]
    fn test_now_is_fixed_per_context() {
        let mut shared = SharedContext::new();
        shared.now = DateTime::parse_from_rfc3339("2020-05-06T07:08:09+02:00").unwrap();
        let first = apply_with(&shared, "now", &[]).unwrap();
        let second = apply_with(&shared, "now", &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.str(), "2020-05-06T07:08:09+02:00");
    }
}
