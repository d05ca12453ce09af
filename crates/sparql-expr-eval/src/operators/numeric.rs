//! Numeric operators and functions
//!
//! Implements: `+`, `-`, `*`, `/`, unary minus and plus, ABS, ROUND, CEIL, FLOOR, RAND.
//!
//! Arithmetic is registered once per numeric value space (integer, decimal, float,
//! double). Mixed operands reach the right overload through subtype substitution
//! (integer is a decimal) and promotion (decimal and float promote to double, decimal
//! promotes to float), so the result type is the least general type holding both
//! operands.

use crate::error::{EvalError, EvalResult};
use crate::overloads::OverloadBuilder;
use crate::registry::{Arity, FunctionRegistry};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{Literal, LiteralValue, Term, numeric_to_decimal, numeric_to_f64};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    fn integers(&self, a: i128, b: i128) -> EvalResult<Term> {
        let result = match self {
            Self::Add => a.checked_add(b),
            Self::Subtract => a.checked_sub(b),
            Self::Multiply => a.checked_mul(b),
            Self::Divide => return self.decimals(integer_to_decimal(a)?, integer_to_decimal(b)?),
        };
        result
            .map(|i| Term::from(Literal::integer(i)))
            .ok_or_else(|| EvalError::overflow(format!("integer {}", self.symbol())))
    }

    fn decimals(&self, a: Decimal, b: Decimal) -> EvalResult<Term> {
        let result = match self {
            Self::Add => a.checked_add(b),
            Self::Subtract => a.checked_sub(b),
            Self::Multiply => a.checked_mul(b),
            Self::Divide if b.is_zero() => return Err(EvalError::DivisionByZero),
            Self::Divide => a.checked_div(b),
        };
        result
            .map(|d| Term::from(Literal::decimal(d.normalize())))
            .ok_or_else(|| EvalError::overflow(format!("decimal {}", self.symbol())))
    }

    fn floats(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }
}

fn integer_to_decimal(value: i128) -> EvalResult<Decimal> {
    Decimal::from_i128(value).ok_or_else(|| EvalError::overflow("integer to decimal"))
}

fn integer_value(literal: &Literal) -> EvalResult<i128> {
    match literal.value {
        LiteralValue::Integer(i) => Ok(i),
        _ => Err(EvalError::invalid_argument_types("integer", [&Term::from(literal.clone())])),
    }
}

fn decimal_value(literal: &Literal) -> EvalResult<Decimal> {
    if let LiteralValue::Integer(i) = literal.value {
        return integer_to_decimal(i);
    }
    numeric_to_decimal(&literal.value)
        .ok_or_else(|| EvalError::invalid_argument_types("decimal", [&Term::from(literal.clone())]))
}

fn float_value(literal: &Literal) -> EvalResult<f64> {
    numeric_to_f64(&literal.value)
        .ok_or_else(|| EvalError::invalid_argument_types("double", [&Term::from(literal.clone())]))
}

/// Register `op` for every numeric value space
pub fn arithmetic(builder: OverloadBuilder, op: ArithmeticOp) -> OverloadBuilder {
    builder
        .on_binary(xsd::INTEGER, xsd::INTEGER, move |a, b, _| {
            op.integers(integer_value(a)?, integer_value(b)?)
        })
        .on_binary(xsd::DECIMAL, xsd::DECIMAL, move |a, b, _| {
            op.decimals(decimal_value(a)?, decimal_value(b)?)
        })
        .on_binary(xsd::FLOAT, xsd::FLOAT, move |a, b, _| {
            Ok(Term::from(Literal::float(op.floats(float_value(a)?, float_value(b)?))))
        })
        .on_binary(xsd::DOUBLE, xsd::DOUBLE, move |a, b, _| {
            Ok(Term::from(Literal::double(op.floats(float_value(a)?, float_value(b)?))))
        })
}

/// Register a unary numeric function that keeps the value space of its argument
fn numeric_unary(
    builder: OverloadBuilder,
    integer: fn(i128) -> Option<i128>,
    decimal: fn(Decimal) -> Decimal,
    float: fn(f64) -> f64,
) -> OverloadBuilder {
    let name = builder.name().to_string();
    builder
        .on_unary(xsd::INTEGER, move |a, _| {
            integer(integer_value(a)?)
                .map(|i| Term::from(Literal::integer(i)))
                .ok_or_else(|| EvalError::overflow(name.clone()))
        })
        .on_unary(xsd::DECIMAL, move |a, _| Ok(Term::from(Literal::decimal(decimal(decimal_value(a)?)))))
        .on_unary(xsd::FLOAT, move |a, _| Ok(Term::from(Literal::float(float(float_value(a)?)))))
        .on_unary(xsd::DOUBLE, move |a, _| Ok(Term::from(Literal::double(float(float_value(a)?)))))
}

fn round_half_up(value: Decimal) -> Decimal {
    (value + Decimal::new(5, 1)).floor()
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_operator(
        arithmetic(OverloadBuilder::new("*", Arity::Exact(2)), ArithmeticOp::Multiply).build(),
    );
    registry.register_operator(
        arithmetic(OverloadBuilder::new("/", Arity::Exact(2)), ArithmeticOp::Divide).build(),
    );

    registry.register_operator(
        numeric_unary(
            OverloadBuilder::new("uminus", Arity::Exact(1)),
            i128::checked_neg,
            |d| -d,
            |f| -f,
        )
        .build(),
    );
    registry.register_operator(
        numeric_unary(OverloadBuilder::new("uplus", Arity::Exact(1)), Some, |d| d, |f| f).build(),
    );

    registry.register_operator(
        numeric_unary(OverloadBuilder::new("abs", Arity::Exact(1)), i128::checked_abs, |d| d.abs(), f64::abs)
            .build(),
    );
    registry.register_operator(
        numeric_unary(OverloadBuilder::new("ceil", Arity::Exact(1)), Some, |d| d.ceil(), f64::ceil).build(),
    );
    registry.register_operator(
        numeric_unary(OverloadBuilder::new("floor", Arity::Exact(1)), Some, |d| d.floor(), f64::floor).build(),
    );
    registry.register_operator(
        numeric_unary(
            OverloadBuilder::new("round", Arity::Exact(1)),
            Some,
            round_half_up,
            |f| (f + 0.5).floor(),
        )
        .build(),
    );

    registry.register_operator(
        OverloadBuilder::new("rand", Arity::Exact(0))
            .set(&[], |_, _| Ok(Term::from(Literal::double(rand::random::<f64>()))))
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FunctionContext, SharedContext};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sparql_expr_types::TermTransformer;

    fn apply(name: &str, args: &[Term]) -> EvalResult<Term> {
        let registry = FunctionRegistry::with_standard_functions();
        let shared = SharedContext::new();
        let ctx = FunctionContext {
            shared: &shared,
            functions: &registry,
        };
        registry.apply(name, args, &ctx)
    }

    fn lit(lexical: &str, datatype: &str) -> Term {
        let shared = SharedContext::new();
        Term::from(TermTransformer::new(&shared.lattice).transform_literal(lexical, datatype, None))
    }

    #[rstest]
    #[case("+", "1", xsd::INTEGER, "2", xsd::INTEGER, "\"3\"^^<http://www.w3.org/2001/XMLSchema#integer>")]
    #[case("+", "1", xsd::INTEGER, "1.5", xsd::DECIMAL, "\"2.5\"^^<http://www.w3.org/2001/XMLSchema#decimal>")]
    #[case("+", "0", xsd::INTEGER, "1", xsd::DOUBLE, "\"1.0E0\"^^<http://www.w3.org/2001/XMLSchema#double>")]
    #[case("*", "2", xsd::BYTE, "1.5", xsd::FLOAT, "\"3\"^^<http://www.w3.org/2001/XMLSchema#float>")]
    #[case("/", "1", xsd::INTEGER, "4", xsd::INTEGER, "\"0.25\"^^<http://www.w3.org/2001/XMLSchema#decimal>")]
    #[case("/", "1", xsd::DOUBLE, "0", xsd::INTEGER, "\"INF\"^^<http://www.w3.org/2001/XMLSchema#double>")]
    #[case("-", "1.5", xsd::FLOAT, "0.5", xsd::DOUBLE, "\"1.0E0\"^^<http://www.w3.org/2001/XMLSchema#double>")]
    fn test_arithmetic_widening(
        #[case] op: &str,
        #[case] a: &str,
        #[case] a_type: &str,
        #[case] b: &str,
        #[case] b_type: &str,
        #[case] expected: &str,
    ) {
        let result = apply(op, &[lit(a, a_type), lit(b, b_type)]).unwrap();
        assert_eq!(result.to_string(), expected);
    }

    #[test]
    fn test_integer_division_by_zero() {
        let err = apply("/", &[lit("1", xsd::INTEGER), lit("0", xsd::INTEGER)]).unwrap_err();
        assert!(matches!(err, EvalError::DivisionByZero));
    }

    #[test]
    fn test_integer_overflow() {
        let err = apply("*", &[Term::from(Literal::integer(i128::MAX)), lit("2", xsd::INTEGER)]).unwrap_err();
        assert!(matches!(err, EvalError::Overflow { .. }));
    }

    #[rstest]
    #[case("+", "18446744073709551615", xsd::UNSIGNED_LONG, "1", "18446744073709551616")]
    #[case("-", "-9223372036854775808", xsd::LONG, "1", "-9223372036854775809")]
    #[case("*", "9223372036854775807", xsd::INTEGER, "2", "18446744073709551614")]
    fn test_integers_beyond_64_bits(
        #[case] op: &str,
        #[case] a: &str,
        #[case] a_type: &str,
        #[case] b: &str,
        #[case] expected: &str,
    ) {
        let result = apply(op, &[lit(a, a_type), lit(b, xsd::INTEGER)]).unwrap();
        assert_eq!(result, Term::from(Literal::integer(expected.parse::<i128>().unwrap())));
    }

    #[test]
    fn test_large_integer_division() {
        let result = apply("/", &[lit("18446744073709551615", xsd::INTEGER), lit("5", xsd::INTEGER)]).unwrap();
        assert_eq!(result.str(), "3689348814741910323");
    }

    #[test]
    fn test_non_numeric_arguments() {
        let err = apply("+", &[lit("1", xsd::INTEGER), Term::from(Literal::string("1"))]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgumentTypes { .. }));
        let err = apply("+", &[lit("x", xsd::INTEGER), lit("1", xsd::INTEGER)]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgumentTypes { .. }));
    }

    #[rstest]
    #[case("round", "2.5", xsd::DECIMAL, "3")]
    #[case("round", "-2.5", xsd::DECIMAL, "-2")]
    #[case("round", "-2.6", xsd::DOUBLE, "-3.0E0")]
    #[case("ceil", "1.1", xsd::DECIMAL, "2")]
    #[case("floor", "-1.1", xsd::DECIMAL, "-2")]
    #[case("abs", "-7", xsd::INTEGER, "7")]
    #[case("uminus", "3", xsd::INTEGER, "-3")]
    fn test_unary_functions(#[case] name: &str, #[case] value: &str, #[case] datatype: &str, #[case] expected: &str) {
        let result = apply(name, &[lit(value, datatype)]).unwrap();
        assert_eq!(result.str(), expected);
    }

    #[test]
    fn test_rand_in_unit_interval() {
        let result = apply("rand", &[]).unwrap();
        match result.as_literal().map(|l| &l.value) {
            Some(LiteralValue::Double(d)) => assert!((0.0..1.0).contains(d)),
            other => panic!("unexpected RAND result {:?}", other),
        }
    }
}
