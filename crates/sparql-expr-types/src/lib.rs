//! SPARQL expression value model
//!
//! This crate defines the values the expression evaluator computes with:
//! - RDF terms and typed literals
//! - The datatype lattice with open-world discovery and type promotion
//! - XSD lexical parsers, temporal records and date/duration arithmetic
//! - Conversion of raw literals into typed literals

pub mod coercion;
pub mod date_math;
pub mod lexical;
pub mod temporal;
pub mod term;
pub mod transform;
pub mod type_system;
pub mod value;
pub mod vocab;

pub use coercion::{ConversionFn, Promotion, numeric_to_decimal, numeric_to_f64, promotions_into};
pub use date_math::{FloorDiv, add_duration_to_date_time, elapsed_duration, max_day_in_month, to_utc_seconds};
pub use lexical::LexicalError;
pub use temporal::{DateTimeValue, DateValue, DurationValue, TimeValue, TimeZone};
pub use term::{Quad, Term, TermKind};
pub use transform::TermTransformer;
pub use type_system::{OverrideType, SuperTypes, TERM, TypeAlias, TypeDiscoverer, TypeLattice};
pub use value::{Literal, LiteralValue, ValueError, format_double, format_float};
