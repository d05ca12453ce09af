//! SPARQL expression evaluation for Rust
//!
//! This crate bundles the expression engine of a SPARQL query processor:
//! - Typed RDF terms, the XSD datatype lattice and lexical parsing
//! - Overload resolution with subtype substitution and numeric promotion
//! - Synchronous and suspension-capable evaluation of filter and bind expressions
//! - Aggregation and the total term order used for sorting
//!
//! # Example
//!
//! ```
//! use sparql_expr::eval::{Algebra, Bindings, EvaluatorBuilder};
//! use sparql_expr::types::Literal;
//!
//! let algebra = Algebra::operator(
//!     "+",
//!     vec![Algebra::term(Literal::integer(0)), Algebra::term(Literal::double(1.0))],
//! );
//! let evaluator = EvaluatorBuilder::new().build_sync(&algebra).unwrap();
//! assert_eq!(evaluator.evaluate(&Bindings::new()).unwrap().str(), "1.0E0");
//! ```

// Re-export all public APIs from internal crates
pub use sparql_expr_eval as eval;
pub use sparql_expr_types as types;

// Convenience re-exports
pub use sparql_expr_eval::{
    AggregateEvaluator, Algebra, AsyncEvaluator, Bindings, EvalError, EvalResult, EvaluatorBuilder, SyncEvaluator,
};
pub use sparql_expr_types::{Literal, Term, TypeLattice};
