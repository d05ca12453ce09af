//! Mock capabilities

use async_trait::async_trait;
use futures::future::BoxFuture;
use sparql_expr_eval::expression::{AggregateExpression, ExistenceExpression};
use sparql_expr_eval::{
    AsyncExtensionFn, AsyncHooks, BoxError, Bindings, EvalError, EvalResult, ExistenceHook, ExtensionFn,
};
use sparql_expr_types::{Literal, Term};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Existence hook reporting a match when the pattern label is a bound variable
pub fn exists_if_bound() -> ExistenceHook {
    Arc::new(|existence: &ExistenceExpression, bindings: &Bindings| -> EvalResult<bool> {
        Ok(bindings.contains(&existence.pattern.label))
    })
}

/// Extension upper-casing its first argument
pub fn upper_extension() -> ExtensionFn {
    Arc::new(|args: &[Term]| -> Result<Term, BoxError> {
        let value = args.first().map(Term::str).unwrap_or_default();
        Ok(Term::from(Literal::string(value.to_uppercase())))
    })
}

/// Extension that always fails
pub fn failing_extension() -> ExtensionFn {
    Arc::new(|_: &[Term]| -> Result<Term, BoxError> { Err("extension exploded".into()) })
}

/// Suspending extension counting its invocations and returning the argument count
#[derive(Clone, Default)]
pub struct CountingExtension {
    pub calls: Arc<AtomicUsize>,
}

impl CountingExtension {
    pub fn function(&self) -> AsyncExtensionFn {
        let calls = Arc::clone(&self.calls);
        Arc::new(move |args: Vec<Term>| -> BoxFuture<'static, Result<Term, BoxError>> {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                tokio::task::yield_now().await;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Term::from(Literal::integer(args.len() as i64)))
            })
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Async capabilities backed by fixed answers
pub struct MockAsyncHooks {
    pub exists: bool,
    pub aggregate: Option<Term>,
}

#[async_trait]
impl AsyncHooks for MockAsyncHooks {
    async fn exists(&self, _expression: &ExistenceExpression, _bindings: &Bindings) -> EvalResult<bool> {
        tokio::task::yield_now().await;
        Ok(self.exists)
    }

    async fn aggregate(&self, expression: &AggregateExpression) -> EvalResult<Term> {
        self.aggregate
            .clone()
            .ok_or_else(|| EvalError::missing_capability(format!("aggregate {}", expression.aggregator)))
    }

    async fn bnode(&self, seed: Option<&str>) -> EvalResult<String> {
        Ok(format!("mock-{}", seed.unwrap_or("fresh")))
    }
}
