//! Evaluation context for expression execution
//!
//! [`SharedContext`] holds the values and caches shared by every evaluation of an
//! expression: the evaluation time, base IRI, default timezone, the type lattice and
//! the overload resolution and regex caches. [`EvaluatorContext`] adds the function catalog and
//! the caller-supplied capabilities.

use crate::error::{BoxError, EvalError, EvalResult};
use crate::expression::{AggregateExpression, ExistenceExpression};
use crate::operators::string::RegexCache;
use crate::registry::{FunctionArgumentsCache, FunctionRegistry};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sparql_expr_types::lexical::parse_time_zone;
use sparql_expr_types::{Term, TimeZone, TypeLattice};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Variable bindings of one solution row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    values: IndexMap<String, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, returning self for chaining
    pub fn with(mut self, variable: impl Into<String>, term: impl Into<Term>) -> Self {
        self.insert(variable, term);
        self
    }

    pub fn insert(&mut self, variable: impl Into<String>, term: impl Into<Term>) {
        self.values.insert(variable.into(), term.into());
    }

    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.values.get(variable)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.values.contains_key(variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Order-independent identity of the row (`var=value` pairs sorted by variable)
    pub fn row_key(&self) -> String {
        let mut pairs: Vec<String> = self
            .values
            .iter()
            .map(|(variable, term)| format!("{}={}", variable, term))
            .collect();
        pairs.sort();
        pairs.join(" ")
    }
}

impl<K: Into<String>, V: Into<Term>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (variable, term) in iter {
            bindings.insert(variable, term);
        }
        bindings
    }
}

/// Values and caches shared by all evaluations of an expression
#[derive(Debug, Clone)]
pub struct SharedContext {
    pub now: DateTime<FixedOffset>,
    pub base_iri: Option<String>,
    pub default_timezone: TimeZone,
    pub lattice: Arc<TypeLattice>,
    pub function_cache: Arc<FunctionArgumentsCache>,
    pub regex_cache: Arc<RegexCache>,
}

impl SharedContext {
    pub fn new() -> Self {
        let now = Local::now().fixed_offset();
        Self {
            now,
            base_iri: None,
            default_timezone: TimeZone::from(*now.offset()),
            lattice: Arc::new(TypeLattice::new()),
            function_cache: Arc::new(FunctionArgumentsCache::new()),
            regex_cache: Arc::new(RegexCache::new()),
        }
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Synchronous existence check for EXISTS / NOT EXISTS
pub type ExistenceHook = Arc<dyn Fn(&ExistenceExpression, &Bindings) -> EvalResult<bool> + Send + Sync>;

/// Synchronous lookup of a precomputed aggregate value
pub type AggregateHook = Arc<dyn Fn(&AggregateExpression) -> EvalResult<Term> + Send + Sync>;

/// Blank node id generator, optionally seeded
pub type BnodeHook = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// Synchronous extension function
pub type ExtensionFn = Arc<dyn Fn(&[Term]) -> Result<Term, BoxError> + Send + Sync>;

/// Suspending extension function
pub type AsyncExtensionFn = Arc<dyn Fn(Vec<Term>) -> BoxFuture<'static, Result<Term, BoxError>> + Send + Sync>;

/// Resolves an extension function IRI
pub type ExtensionResolver = Arc<dyn Fn(&str) -> Option<ExtensionFn> + Send + Sync>;

/// Resolves an extension function IRI to a suspending implementation
pub type AsyncExtensionResolver = Arc<dyn Fn(&str) -> Option<AsyncExtensionFn> + Send + Sync>;

static BNODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blank node id used when no generator is configured: the seed, or a fresh `b{n}`
pub fn default_bnode(seed: Option<&str>) -> String {
    match seed {
        Some(seed) => seed.to_string(),
        None => format!("b{}", BNODE_COUNTER.fetch_add(1, Ordering::Relaxed)),
    }
}

/// Capabilities of the synchronous evaluator
#[derive(Clone, Default)]
pub struct SyncHooks {
    pub exists: Option<ExistenceHook>,
    pub aggregate: Option<AggregateHook>,
    pub bnode: Option<BnodeHook>,
}

impl fmt::Debug for SyncHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks")
            .field("exists", &self.exists.is_some())
            .field("aggregate", &self.aggregate.is_some())
            .field("bnode", &self.bnode.is_some())
            .finish()
    }
}

/// Capabilities of the suspension-capable evaluator
///
/// Every method has a default: existence and aggregate report a missing capability,
/// blank nodes use [`default_bnode`].
#[async_trait]
pub trait AsyncHooks: Send + Sync {
    async fn exists(&self, _expression: &ExistenceExpression, _bindings: &Bindings) -> EvalResult<bool> {
        Err(EvalError::missing_capability("existence check"))
    }

    async fn aggregate(&self, _expression: &AggregateExpression) -> EvalResult<Term> {
        Err(EvalError::missing_capability("aggregate"))
    }

    async fn bnode(&self, seed: Option<&str>) -> EvalResult<String> {
        Ok(default_bnode(seed))
    }
}

/// Async hooks with every default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAsyncHooks;

impl AsyncHooks for DefaultAsyncHooks {}

/// Everything an evaluator needs besides the expression
#[derive(Clone)]
pub struct EvaluatorContext {
    pub shared: Arc<SharedContext>,
    pub functions: Arc<FunctionRegistry>,
    pub hooks: SyncHooks,
    pub async_hooks: Arc<dyn AsyncHooks>,
}

impl EvaluatorContext {
    pub fn new(shared: Arc<SharedContext>, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            shared,
            functions,
            hooks: SyncHooks::default(),
            async_hooks: Arc::new(DefaultAsyncHooks),
        }
    }

    /// Context handed to function implementations
    pub fn function_context(&self) -> FunctionContext<'_> {
        FunctionContext {
            shared: &self.shared,
            functions: &self.functions,
        }
    }
}

impl Default for EvaluatorContext {
    fn default() -> Self {
        Self::new(
            Arc::new(SharedContext::new()),
            FunctionRegistry::standard(),
        )
    }
}

impl fmt::Debug for EvaluatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorContext")
            .field("shared", &self.shared)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Borrowed context available to function implementations
#[derive(Clone, Copy)]
pub struct FunctionContext<'a> {
    pub shared: &'a SharedContext,
    pub functions: &'a FunctionRegistry,
}

// ============================================================================
// Configuration
// ============================================================================

/// Serializable evaluator options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorOptions {
    pub base_iri: Option<String>,
    /// Lexical timezone such as `+01:00` or `Z`
    pub default_timezone: Option<String>,
    pub strict_aggregates: bool,
}

impl EvaluatorOptions {
    /// Load options from a JSON document
    pub fn from_json(json: &str) -> EvalResult<Self> {
        serde_json::from_str(json).map_err(|e| EvalError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    /// Parsed default timezone, if one is set
    pub fn timezone(&self) -> EvalResult<Option<TimeZone>> {
        self.default_timezone
            .as_deref()
            .map(|tz| {
                parse_time_zone(tz).map_err(|e| EvalError::InvalidConfiguration {
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparql_expr_types::Literal;

    #[test]
    fn test_row_key_is_order_independent() {
        let a = Bindings::new()
            .with("x", Literal::integer(1))
            .with("y", Term::named_node("http://ex/a"));
        let b = Bindings::new()
            .with("y", Term::named_node("http://ex/a"))
            .with("x", Literal::integer(1));
        assert_eq!(a.row_key(), b.row_key());
        assert_eq!(Bindings::new().row_key(), "");
    }

    #[test]
    fn test_options_from_json() {
        let options = EvaluatorOptions::from_json(
            r#"{"base_iri": "http://example.org/", "default_timezone": "-05:00"}"#,
        )
        .unwrap();
        assert_eq!(options.base_iri.as_deref(), Some("http://example.org/"));
        assert_eq!(options.timezone().unwrap(), Some(TimeZone::new(-5, 0)));
        assert!(!options.strict_aggregates);
    }

    #[test]
    fn test_options_reject_bad_timezone() {
        let options = EvaluatorOptions::from_json(r#"{"default_timezone": "CET"}"#).unwrap();
        assert!(matches!(
            options.timezone(),
            Err(EvalError::InvalidConfiguration { .. })
        ));
        assert!(EvaluatorOptions::from_json("{").is_err());
    }

    #[test]
    fn test_default_bnode() {
        assert_eq!(default_bnode(Some("seed")), "seed");
        assert_ne!(default_bnode(None), default_bnode(None));
    }
}
