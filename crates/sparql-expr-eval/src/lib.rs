//! SPARQL Expression Evaluation Engine
//!
//! This crate evaluates SPARQL filter, bind and projection expressions against solution
//! rows. It provides:
//!
//! - **Overload Resolution**: type tries per function with subtype substitution,
//!   numeric promotion and a memo cache of resolved argument types
//! - **Built-in Functions**: arithmetic, comparisons, term accessors, strings, regular
//!   expressions, date and time accessors and arithmetic, XSD casts
//! - **Special Forms**: BOUND, IF, COALESCE, `||`, `&&`, sameTerm, IN, NOT IN, CONCAT
//!   and BNODE with three-valued error handling
//! - **Evaluators**: a synchronous evaluator and a suspension-capable one for
//!   existence checks and asynchronous extension functions
//! - **Aggregation**: COUNT, SUM, MIN, MAX, AVG, SAMPLE and GROUP_CONCAT with DISTINCT
//! - **Ordering**: the total term order used for sorting
//!
//! # Example
//!
//! ```
//! use sparql_expr_eval::{Algebra, Bindings, EvaluatorBuilder};
//! use sparql_expr_types::Literal;
//!
//! let algebra = Algebra::operator(
//!     "strlen",
//!     vec![Algebra::variable("name")],
//! );
//! let evaluator = EvaluatorBuilder::new().build_sync(&algebra).unwrap();
//! let bindings = Bindings::new().with("name", Literal::string("Alice"));
//! assert_eq!(evaluator.evaluate(&bindings).unwrap().str(), "5");
//! ```
//!
//! # Architecture
//!
//! - `builder`: resolves [`Algebra`] into an [`Expression`] and assembles evaluators
//! - `registry` and `overloads`: the function catalog and per-function type tries
//! - `operators`: implementations of the regular built-in functions
//! - `special`: shared parts of the special forms
//! - `engine` and `async_engine`: the two tree walkers
//! - `aggregate` and `ordering`: group accumulation and sorting
//!
//! # Error Handling
//!
//! Expression errors (unbound variables, type errors, invalid lexical forms) can be
//! intercepted by the logical special forms. Definition errors are raised while
//! building and extension errors always abort the evaluation.

pub mod aggregate;
pub mod async_engine;
pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod expression;
pub mod operators;
pub mod ordering;
pub mod overloads;
pub mod registry;
pub mod special;

// Re-export main types
pub use aggregate::{AggregateEvaluator, AggregatorKind};
pub use async_engine::AsyncEvaluator;
pub use builder::{EvaluatorBuilder, ExpressionBuilder};
pub use context::{
    AggregateHook, AsyncExtensionFn, AsyncExtensionResolver, AsyncHooks, Bindings, BnodeHook, DefaultAsyncHooks,
    EvaluatorContext, EvaluatorOptions, ExistenceHook, ExtensionFn, ExtensionResolver, FunctionContext,
    SharedContext, SyncHooks,
};
pub use engine::{SyncEvaluator, to_rdf};
pub use error::{BoxError, EvalError, EvalResult};
pub use expression::{Algebra, Expression, Pattern, SpecialForm};
pub use ordering::{order_terms, order_terms_desc};
pub use operators::string::RegexCache;
pub use registry::{Arity, FunctionArgumentsCache, FunctionRegistry, RegularFunction};
