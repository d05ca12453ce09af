//! Built-in function catalog
//!
//! This module contains the regular functions resolved through overload trees,
//! organized by category:
//! - Numeric operators and functions (`*`, `/`, ABS, ROUND, ...)
//! - Comparison operators (`=`, `<`, ...) and logical negation
//! - Term accessors and constructors (STR, DATATYPE, IRI, ...)
//! - String functions (STRLEN, SUBSTR, REGEX, ...)
//! - Date and time functions and temporal arithmetic
//! - XSD constructor casts, registered as named functions
//!
//! `+` and `-` combine the numeric and the temporal overloads in one tree.

pub mod cast;
pub mod comparison;
pub mod datetime;
pub mod numeric;
pub mod string;
pub mod terms;

use crate::overloads::OverloadBuilder;
use crate::registry::{Arity, FunctionRegistry};
use numeric::ArithmeticOp;
use sparql_expr_types::vocab::xsd;

/// Same-type pairs of the four numeric value spaces
pub(crate) fn numeric_pairs() -> &'static [(&'static str, &'static str)] {
    &[
        (xsd::INTEGER, xsd::INTEGER),
        (xsd::DECIMAL, xsd::DECIMAL),
        (xsd::FLOAT, xsd::FLOAT),
        (xsd::DOUBLE, xsd::DOUBLE),
    ]
}

fn additive(op: ArithmeticOp) -> OverloadBuilder {
    let builder = OverloadBuilder::new(op.symbol(), Arity::Exact(2));
    datetime::arithmetic(numeric::arithmetic(builder, op), op)
}

/// Register every built-in regular function
pub fn register_standard(registry: &mut FunctionRegistry) {
    registry.register_operator(additive(ArithmeticOp::Add).build());
    registry.register_operator(additive(ArithmeticOp::Subtract).build());
    numeric::register(registry);
    comparison::register(registry);
    terms::register(registry);
    string::register(registry);
    datetime::register(registry);
    cast::register(registry);
}
