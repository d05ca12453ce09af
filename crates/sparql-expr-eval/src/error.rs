//! Evaluation errors for the expression engine
//!
//! Errors fall in three groups:
//! - expression errors, which the logical special forms may intercept,
//! - definition errors, raised while building an expression tree,
//! - extension errors, raised inside caller-supplied functions.
//!
//! Only expression errors are ever caught during evaluation.

use sparql_expr_types::{LexicalError, ValueError};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Error type produced by caller-supplied functions
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A list of errors collected by COALESCE and IN
#[derive(Debug, Clone, Default)]
pub struct ErrorList(pub Vec<EvalError>);

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Errors that can occur while building or evaluating an expression
#[derive(Debug, Error, Clone)]
pub enum EvalError {
    // === Expression errors ===
    /// Variable has no value in the current bindings
    #[error("Unbound variable: ?{name}")]
    UnboundVariable { name: String },

    /// Lexical form outside the value space of its datatype
    #[error("Invalid lexical form '{lexical}' for {datatype}")]
    InvalidLexicalForm { lexical: String, datatype: String },

    /// Term has no effective boolean value
    #[error("Cannot coerce term to EBV: {term}")]
    EbvCoercion { term: String },

    /// Two different literals with no typed equality
    #[error("Equality test for literals with unsupported datatypes: {left} = {right}")]
    RdfEqualType { left: String, right: String },

    /// No overload accepts the argument types
    #[error("Argument types not valid for operator {function}: {args}")]
    InvalidArgumentTypes { function: String, args: String },

    /// Strict aggregate over an empty group
    #[error("Empty aggregate expression: {aggregator}")]
    EmptyAggregate { aggregator: String },

    /// Every COALESCE operand failed
    #[error("All COALESCE arguments threw errors: {errors}")]
    Coalesce { errors: ErrorList },

    /// No IN comparison matched and at least one failed
    #[error("Some argument in IN produced an error: {errors}")]
    InError { errors: ErrorList },

    /// Integer or decimal division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Arithmetic overflow
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// Cast from an incompatible value
    #[error("Cannot cast {value} to {datatype}")]
    CastError { value: String, datatype: String },

    /// TIMEZONE of a value without timezone
    #[error("Value has no timezone: {value}")]
    MissingTimezone { value: String },

    /// Language tags of two string arguments are not compatible
    #[error("Incompatible language tags: {left} and {right}")]
    IncompatibleLanguageTags { left: String, right: String },

    /// Invalid regular expression or flags
    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// IRI construction failed
    #[error("Invalid IRI: {iri}")]
    InvalidIri { iri: String },

    // === Definition errors ===
    /// Operator name not in the catalog
    #[error("Unknown operator: {name}")]
    UnknownOperator { name: String },

    /// Named function IRI neither built in nor resolved by the extension resolver
    #[error("Unknown named function: {iri}")]
    UnknownNamedFunction { iri: String },

    /// Aggregate name not supported
    #[error("Unknown aggregator: {name}")]
    UnknownAggregator { name: String },

    /// Number of arguments not accepted by a function
    #[error("Invalid arity for {function}: expected {expected}, got {actual}")]
    InvalidArity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Expression tree shape not accepted
    #[error("Malformed expression: {message}")]
    MalformedExpression { message: String },

    /// Node needs the suspension-capable evaluator
    #[error("{feature} is not supported in synchronous evaluation")]
    UnsupportedInSyncMode { feature: String },

    /// No capability configured for a node that needs one
    #[error("Missing capability: {capability}")]
    MissingCapability { capability: String },

    /// Configuration could not be loaded
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // === Extension errors ===
    /// Error raised inside an extension function
    #[error("Error in extension function {name}: {source}")]
    Extension {
        name: String,
        source: Arc<dyn StdError + Send + Sync>,
    },
}

impl EvalError {
    /// Whether the logical special forms may intercept this error
    pub fn is_expression_error(&self) -> bool {
        matches!(
            self,
            Self::UnboundVariable { .. }
                | Self::InvalidLexicalForm { .. }
                | Self::EbvCoercion { .. }
                | Self::RdfEqualType { .. }
                | Self::InvalidArgumentTypes { .. }
                | Self::EmptyAggregate { .. }
                | Self::Coalesce { .. }
                | Self::InError { .. }
                | Self::DivisionByZero
                | Self::Overflow { .. }
                | Self::CastError { .. }
                | Self::MissingTimezone { .. }
                | Self::IncompatibleLanguageTags { .. }
                | Self::InvalidRegex { .. }
                | Self::InvalidIri { .. }
        )
    }

    pub fn unbound_variable(name: impl Into<String>) -> Self {
        Self::UnboundVariable { name: name.into() }
    }

    /// Create an invalid argument types error listing the arguments
    pub fn invalid_argument_types<'a>(
        function: impl Into<String>,
        args: impl IntoIterator<Item = &'a sparql_expr_types::Term>,
    ) -> Self {
        let args: Vec<String> = args.into_iter().map(ToString::to_string).collect();
        Self::InvalidArgumentTypes {
            function: function.into(),
            args: args.join(", "),
        }
    }

    pub fn empty_aggregate(aggregator: impl Into<String>) -> Self {
        Self::EmptyAggregate {
            aggregator: aggregator.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    pub fn cast_error(value: impl ToString, datatype: impl Into<String>) -> Self {
        Self::CastError {
            value: value.to_string(),
            datatype: datatype.into(),
        }
    }

    pub fn invalid_arity(function: impl Into<String>, expected: impl ToString, actual: usize) -> Self {
        Self::InvalidArity {
            function: function.into(),
            expected: expected.to_string(),
            actual,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedExpression {
            message: message.into(),
        }
    }

    pub fn unsupported_in_sync_mode(feature: impl Into<String>) -> Self {
        Self::UnsupportedInSyncMode {
            feature: feature.into(),
        }
    }

    pub fn missing_capability(capability: impl Into<String>) -> Self {
        Self::MissingCapability {
            capability: capability.into(),
        }
    }

    /// Wrap an error raised by an extension function with the function's name
    pub fn extension(name: impl Into<String>, source: BoxError) -> Self {
        Self::Extension {
            name: name.into(),
            source: Arc::from(source),
        }
    }
}

impl From<LexicalError> for EvalError {
    fn from(error: LexicalError) -> Self {
        Self::InvalidLexicalForm {
            lexical: error.value,
            datatype: error.kind.to_string(),
        }
    }
}

impl From<ValueError> for EvalError {
    fn from(error: ValueError) -> Self {
        match error {
            ValueError::EbvCoercion { term } => Self::EbvCoercion { term },
            ValueError::Lexical(lexical) => lexical.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(EvalError::unbound_variable("x").is_expression_error());
        assert!(EvalError::DivisionByZero.is_expression_error());
        assert!(!EvalError::invalid_arity("str", 1, 2).is_expression_error());
        assert!(!EvalError::UnknownOperator { name: "foo".into() }.is_expression_error());
        let ext = EvalError::extension("http://ex/f", "boom".into());
        assert!(!ext.is_expression_error());
        assert_eq!(ext.to_string(), "Error in extension function http://ex/f: boom");
    }

    #[test]
    fn test_error_list_display() {
        let errors = ErrorList(vec![
            EvalError::unbound_variable("a"),
            EvalError::DivisionByZero,
        ]);
        assert_eq!(
            EvalError::Coalesce { errors }.to_string(),
            "All COALESCE arguments threw errors: Unbound variable: ?a; Division by zero"
        );
    }
}
