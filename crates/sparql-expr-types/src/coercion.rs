//! Type promotion rules
//!
//! Promotion converts an argument of one concrete datatype into another, unrelated
//! datatype before dispatch (xsd:decimal into xsd:double, xsd:anyURI into xsd:string).
//! It is kept apart from subtype substitution: a promoted value is a new literal of the
//! target type, while a subtype is accepted as-is.

use crate::value::{Literal, LiteralValue};
use crate::vocab::xsd;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Converts a literal of the promoted type into the target type
pub type ConversionFn = fn(&Literal) -> Literal;

/// One source type that may be promoted into a target type
#[derive(Debug, Clone, Copy)]
pub struct Promotion {
    pub type_to_promote: &'static str,
    pub conversion: ConversionFn,
}

const DOUBLE_PROMOTIONS: &[Promotion] = &[
    Promotion {
        type_to_promote: xsd::FLOAT,
        conversion: promote_to_double,
    },
    Promotion {
        type_to_promote: xsd::DECIMAL,
        conversion: promote_to_double,
    },
];

const FLOAT_PROMOTIONS: &[Promotion] = &[Promotion {
    type_to_promote: xsd::DECIMAL,
    conversion: promote_to_float,
}];

const STRING_PROMOTIONS: &[Promotion] = &[Promotion {
    type_to_promote: xsd::ANY_URI,
    conversion: promote_to_string,
}];

/// Types that may be promoted into `target`
pub fn promotions_into(target: &str) -> &'static [Promotion] {
    match target {
        xsd::DOUBLE => DOUBLE_PROMOTIONS,
        xsd::FLOAT => FLOAT_PROMOTIONS,
        xsd::STRING => STRING_PROMOTIONS,
        _ => &[],
    }
}

/// Numeric payload as a double
pub fn numeric_to_f64(value: &LiteralValue) -> Option<f64> {
    match value {
        LiteralValue::Integer(i) => Some(*i as f64),
        LiteralValue::Decimal(d) => d.to_f64(),
        LiteralValue::Float(f) | LiteralValue::Double(f) => Some(*f),
        _ => None,
    }
}

/// Numeric payload as a decimal; non-finite doubles have no decimal value
pub fn numeric_to_decimal(value: &LiteralValue) -> Option<Decimal> {
    match value {
        LiteralValue::Integer(i) => Decimal::from_i128(*i),
        LiteralValue::Decimal(d) => Some(*d),
        LiteralValue::Float(f) | LiteralValue::Double(f) => Decimal::from_f64(*f),
        _ => None,
    }
}

fn promote_to_double(literal: &Literal) -> Literal {
    Literal::double(numeric_to_f64(&literal.value).unwrap_or(f64::NAN))
}

fn promote_to_float(literal: &Literal) -> Literal {
    Literal::float(numeric_to_f64(&literal.value).unwrap_or(f64::NAN))
}

fn promote_to_string(literal: &Literal) -> Literal {
    Literal::string(literal.str())
}
