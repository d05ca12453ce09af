//! Suspension-capable expression evaluator
//!
//! Same semantics as [`SyncEvaluator`](crate::engine::SyncEvaluator), but existence
//! checks, aggregate values, blank node ids and extension functions may suspend. The
//! arguments of named and extension functions are evaluated concurrently; results are
//! collected in argument order and the first error in that order is reported.

use crate::context::{Bindings, EvaluatorContext};
use crate::engine::to_rdf;
use crate::error::{EvalError, EvalResult};
use crate::expression::{Expression, ExtensionExpression, ExtensionFunction, SpecialExpression, SpecialForm};
use crate::overloads::bool_term;
use crate::special::{self, catch, combine_and, combine_or};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use log::trace;
use sparql_expr_types::{Term, TermTransformer};

#[derive(Debug, Clone)]
pub struct AsyncEvaluator {
    expression: Expression,
    context: EvaluatorContext,
}

impl AsyncEvaluator {
    pub fn new(expression: Expression, context: EvaluatorContext) -> Self {
        Self { expression, context }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn context(&self) -> &EvaluatorContext {
        &self.context
    }

    /// Evaluate to an RDF term
    pub async fn evaluate(&self, bindings: &Bindings) -> EvalResult<Term> {
        self.evaluate_as_internal(bindings).await.map(to_rdf)
    }

    /// Evaluate to the effective boolean value of the result
    pub async fn evaluate_as_ebv(&self, bindings: &Bindings) -> EvalResult<bool> {
        special::ebv(&self.evaluate_as_internal(bindings).await?)
    }

    /// Evaluate to the typed internal term
    pub async fn evaluate_as_internal(&self, bindings: &Bindings) -> EvalResult<Term> {
        self.eval(&self.expression, bindings).await
    }

    /// Evaluate any sub-expression against `bindings`
    pub fn eval<'a>(&'a self, expression: &'a Expression, bindings: &'a Bindings) -> BoxFuture<'a, EvalResult<Term>> {
        async move {
            trace!("Evaluating {} node asynchronously", expression.kind_name());
            match expression {
                Expression::Term(term) => Ok(term.clone()),
                Expression::Variable(name) => {
                    let term = bindings
                        .get(name)
                        .ok_or_else(|| EvalError::unbound_variable(name.as_str()))?;
                    Ok(self.transformer().transform_term(term))
                }
                Expression::Operator(op) => {
                    let mut args = Vec::with_capacity(op.args.len());
                    for arg in &op.args {
                        args.push(self.eval(arg, bindings).await?);
                    }
                    op.function.apply(&args, &self.context.function_context())
                }
                Expression::Named(named) => {
                    let args = self.eval_concurrently(&named.args, bindings).await?;
                    named.function.apply(&args, &self.context.function_context())
                }
                Expression::SpecialOperator(special) => self.eval_special(special, bindings).await,
                Expression::Extension(extension) => self.eval_extension(extension, bindings).await,
                Expression::Existence(existence) => {
                    let exists = self.context.async_hooks.exists(existence, bindings).await?;
                    Ok(bool_term(exists != existence.not))
                }
                Expression::Aggregate(aggregate) => {
                    let value = self.context.async_hooks.aggregate(aggregate).await?;
                    Ok(self.transformer().transform_term(&value))
                }
            }
        }
        .boxed()
    }

    async fn eval_concurrently(&self, args: &[Expression], bindings: &Bindings) -> EvalResult<Vec<Term>> {
        join_all(args.iter().map(|arg| self.eval(arg, bindings)))
            .await
            .into_iter()
            .collect()
    }

    async fn eval_ebv(&self, expression: &Expression, bindings: &Bindings) -> EvalResult<bool> {
        special::ebv(&self.eval(expression, bindings).await?)
    }

    fn transformer(&self) -> TermTransformer<'_> {
        TermTransformer::new(&self.context.shared.lattice)
    }

    async fn eval_extension(&self, extension: &ExtensionExpression, bindings: &Bindings) -> EvalResult<Term> {
        let args = self.eval_concurrently(&extension.args, bindings).await?;
        let result = match &extension.function {
            ExtensionFunction::Sync(function) => function(&args),
            ExtensionFunction::Async(function) => function(args).await,
        }
        .map_err(|e| EvalError::extension(extension.iri.as_str(), e))?;
        Ok(self.transformer().transform_term(&result))
    }

    async fn eval_special(&self, special: &SpecialExpression, bindings: &Bindings) -> EvalResult<Term> {
        let args = &special.args;
        match special.form {
            SpecialForm::Bound => match args.first() {
                Some(Expression::Variable(name)) => Ok(bool_term(bindings.contains(name))),
                _ => Err(EvalError::malformed("BOUND requires a variable")),
            },
            SpecialForm::If => {
                let branch = if self.eval_ebv(&args[0], bindings).await? { &args[1] } else { &args[2] };
                self.eval(branch, bindings).await
            }
            SpecialForm::Coalesce => {
                let mut errors = Vec::new();
                for arg in args {
                    match catch(self.eval(arg, bindings).await)? {
                        Ok(term) => return Ok(term),
                        Err(error) => errors.push(error),
                    }
                }
                Err(special::coalesce_failed(errors))
            }
            SpecialForm::LogicalOr => {
                let left = catch(self.eval_ebv(&args[0], bindings).await)?;
                if matches!(left, Ok(true)) {
                    return Ok(bool_term(true));
                }
                let right = catch(self.eval_ebv(&args[1], bindings).await)?;
                combine_or(left, right).map(bool_term)
            }
            SpecialForm::LogicalAnd => {
                let left = catch(self.eval_ebv(&args[0], bindings).await)?;
                if matches!(left, Ok(false)) {
                    return Ok(bool_term(false));
                }
                let right = catch(self.eval_ebv(&args[1], bindings).await)?;
                combine_and(left, right).map(bool_term)
            }
            SpecialForm::SameTerm => {
                let left = self.eval(&args[0], bindings).await?;
                let right = self.eval(&args[1], bindings).await?;
                Ok(bool_term(left.same_term(&right)))
            }
            SpecialForm::In => self.eval_in(args, bindings).await.map(bool_term),
            SpecialForm::NotIn => self.eval_in(args, bindings).await.map(|found| bool_term(!found)),
            SpecialForm::Concat => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, bindings).await?);
                }
                special::concat(&values)
            }
            SpecialForm::Bnode => {
                let seed = match args.first() {
                    Some(arg) => Some(self.eval(arg, bindings).await?),
                    None => None,
                };
                let seed = special::bnode_seed(seed.as_ref())?;
                let id = self.context.async_hooks.bnode(seed.as_deref()).await?;
                Ok(Term::blank_node(id))
            }
        }
    }

    async fn eval_in(&self, args: &[Expression], bindings: &Bindings) -> EvalResult<bool> {
        let needle = self.eval(&args[0], bindings).await?;
        let mut errors = Vec::new();
        for arg in &args[1..] {
            let outcome = match self.eval(arg, bindings).await {
                Ok(candidate) => {
                    let ctx = self.context.function_context();
                    ctx.functions.test("=", &[needle.clone(), candidate], &ctx)
                }
                Err(error) => Err(error),
            };
            match catch(outcome)? {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(error) => errors.push(error),
            }
        }
        special::in_result(errors)
    }
}
