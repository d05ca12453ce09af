//! Conversion of raw RDF literals into typed literals
//!
//! The value space of a literal is chosen from the lattice ancestors of its datatype,
//! so subtypes such as `xsd:byte` or discovered custom types land in the right family
//! while keeping their declared datatype IRI. A lexical form that is invalid for its
//! family produces a non-lexical literal instead of an error.

use crate::lexical::{
    parse_boolean, parse_date, parse_date_time, parse_day_time_duration, parse_decimal,
    parse_duration, parse_float, parse_integer, parse_time, parse_year_month_duration,
};
use crate::term::Term;
use crate::type_system::{TypeAlias, TypeLattice};
use crate::value::{Literal, LiteralValue};
use crate::vocab::{rdf, xsd};

pub struct TermTransformer<'a> {
    lattice: &'a TypeLattice,
}

impl<'a> TermTransformer<'a> {
    pub fn new(lattice: &'a TypeLattice) -> Self {
        Self { lattice }
    }

    /// Re-type a literal from its lexical form, datatype and language; other terms pass through
    pub fn transform_term(&self, term: &Term) -> Term {
        match term {
            Term::Literal(literal) => Term::Literal(self.transform_literal(
                &literal.str(),
                &literal.datatype,
                literal.language.as_deref(),
            )),
            other => other.clone(),
        }
    }

    /// Build a typed literal
    ///
    /// An empty datatype means `rdf:langString` when a language is given and
    /// `xsd:string` otherwise.
    pub fn transform_literal(&self, lexical: &str, datatype: &str, language: Option<&str>) -> Literal {
        if datatype.is_empty() {
            return match language {
                Some(language) if !language.is_empty() => Literal::lang_string(lexical, language),
                _ => Literal::string(lexical),
            };
        }

        let supers = self.lattice.get_super_types(datatype);
        let is = |ty: &str| supers.contains(ty);

        let value = if is(xsd::STRING) {
            Some(LiteralValue::String(lexical.to_string()))
        } else if is(rdf::LANG_STRING) {
            return Literal::lang_string(lexical, language.unwrap_or_default()).with_lexical(lexical);
        } else if is(xsd::YEAR_MONTH_DURATION) {
            parse_year_month_duration(lexical)
                .ok()
                .map(LiteralValue::YearMonthDuration)
        } else if is(xsd::DAY_TIME_DURATION) {
            parse_day_time_duration(lexical)
                .ok()
                .map(LiteralValue::DayTimeDuration)
        } else if is(xsd::DURATION) {
            parse_duration(lexical).ok().map(LiteralValue::Duration)
        } else if is(xsd::DATE_TIME) {
            parse_date_time(lexical).ok().map(LiteralValue::DateTime)
        } else if is(xsd::BOOLEAN) {
            parse_boolean(lexical).map(LiteralValue::Boolean)
        } else if is(xsd::DATE) {
            parse_date(lexical).ok().map(LiteralValue::Date)
        } else if is(xsd::TIME) {
            parse_time(lexical).ok().map(LiteralValue::Time)
        } else if is(xsd::INTEGER) {
            parse_integer(lexical).map(LiteralValue::Integer)
        } else if is(xsd::DECIMAL) {
            parse_decimal(lexical).map(LiteralValue::Decimal)
        } else if is(xsd::FLOAT) {
            parse_float(lexical).map(LiteralValue::Float)
        } else if is(xsd::DOUBLE) {
            parse_float(lexical).map(LiteralValue::Double)
        } else {
            return Literal::other(lexical, datatype);
        };

        match value {
            Some(value) => Literal {
                value,
                datatype: datatype.to_string(),
                lexical: Some(lexical.to_string()),
                language: None,
            },
            None => {
                let numeric_or_boolean =
                    is(TypeAlias::Numeric.as_str()) || is(xsd::BOOLEAN);
                Literal::non_lexical(lexical, datatype, None, numeric_or_boolean)
            }
        }
    }
}
