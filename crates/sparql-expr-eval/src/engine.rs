//! Synchronous expression evaluator
//!
//! [`SyncEvaluator`] walks a resolved [`Expression`] against one solution row. Regular
//! functions evaluate their arguments eagerly and dispatch through their overload tree;
//! special forms control the evaluation of their own arguments. Existence checks,
//! aggregate values and blank node ids come from the synchronous hooks of the context.

use crate::context::{Bindings, EvaluatorContext, default_bnode};
use crate::error::{EvalError, EvalResult};
use crate::expression::{
    AggregateExpression, ExistenceExpression, Expression, ExtensionExpression, ExtensionFunction,
    SpecialExpression, SpecialForm,
};
use crate::overloads::bool_term;
use crate::special::{self, catch, combine_and, combine_or};
use log::trace;
use sparql_expr_types::{Term, TermTransformer};

/// Literal with its lexical form filled in, ready to hand back to an RDF store
pub fn to_rdf(term: Term) -> Term {
    match term {
        Term::Literal(literal) if literal.lexical.is_none() => {
            let lexical = literal.str();
            Term::Literal(literal.with_lexical(lexical))
        }
        other => other,
    }
}

/// Evaluator for one expression without suspension points
#[derive(Debug, Clone)]
pub struct SyncEvaluator {
    expression: Expression,
    context: EvaluatorContext,
}

impl SyncEvaluator {
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
    pub fn evaluate(&self, bindings: &Bindings) -> EvalResult<Term> {
        self.evaluate_as_internal(bindings).map(to_rdf)
    }

    /// Evaluate to the effective boolean value of the result
    pub fn evaluate_as_ebv(&self, bindings: &Bindings) -> EvalResult<bool> {
        special::ebv(&self.evaluate_as_internal(bindings)?)
    }

    /// Evaluate to the typed internal term
    pub fn evaluate_as_internal(&self, bindings: &Bindings) -> EvalResult<Term> {
        self.eval(&self.expression, bindings)
    }

    /// Evaluate any sub-expression against `bindings`
    pub fn eval(&self, expression: &Expression, bindings: &Bindings) -> EvalResult<Term> {
        trace!("Evaluating {} node", expression.kind_name());
        match expression {
            Expression::Term(term) => Ok(term.clone()),
            Expression::Variable(name) => self.eval_variable(name, bindings),
            Expression::Operator(op) => {
                let args = self.eval_args(&op.args, bindings)?;
                op.function.apply(&args, &self.context.function_context())
            }
            Expression::Named(named) => {
                let args = self.eval_args(&named.args, bindings)?;
                named.function.apply(&args, &self.context.function_context())
            }
            Expression::SpecialOperator(special) => self.eval_special(special, bindings),
            Expression::Extension(extension) => self.eval_extension(extension, bindings),
            Expression::Existence(existence) => self.eval_existence(existence, bindings),
            Expression::Aggregate(aggregate) => self.eval_aggregate(aggregate),
        }
    }

    fn eval_args(&self, args: &[Expression], bindings: &Bindings) -> EvalResult<Vec<Term>> {
        args.iter().map(|arg| self.eval(arg, bindings)).collect()
    }

    fn eval_ebv(&self, expression: &Expression, bindings: &Bindings) -> EvalResult<bool> {
        special::ebv(&self.eval(expression, bindings)?)
    }

    fn transformer(&self) -> TermTransformer<'_> {
        TermTransformer::new(&self.context.shared.lattice)
    }

    fn eval_variable(&self, name: &str, bindings: &Bindings) -> EvalResult<Term> {
        let term = bindings
            .get(name)
            .ok_or_else(|| EvalError::unbound_variable(name))?;
        Ok(self.transformer().transform_term(term))
    }

    fn eval_extension(&self, extension: &ExtensionExpression, bindings: &Bindings) -> EvalResult<Term> {
        let ExtensionFunction::Sync(function) = &extension.function else {
            return Err(EvalError::unsupported_in_sync_mode(format!(
                "asynchronous extension function <{}>",
                extension.iri
            )));
        };
        let args = self.eval_args(&extension.args, bindings)?;
        let result = function(&args).map_err(|e| EvalError::extension(extension.iri.as_str(), e))?;
        Ok(self.transformer().transform_term(&result))
    }

    fn eval_existence(&self, existence: &ExistenceExpression, bindings: &Bindings) -> EvalResult<Term> {
        let hook = self
            .context
            .hooks
            .exists
            .as_ref()
            .ok_or_else(|| EvalError::missing_capability("existence check"))?;
        let exists = hook(existence, bindings)?;
        Ok(bool_term(exists != existence.not))
    }

    fn eval_aggregate(&self, aggregate: &AggregateExpression) -> EvalResult<Term> {
        let hook = self
            .context
            .hooks
            .aggregate
            .as_ref()
            .ok_or_else(|| EvalError::missing_capability("aggregate"))?;
        let value = hook(aggregate)?;
        Ok(self.transformer().transform_term(&value))
    }

    // ========================================================================
    // Special forms
    // ========================================================================

    fn eval_special(&self, special: &SpecialExpression, bindings: &Bindings) -> EvalResult<Term> {
        let args = &special.args;
        match special.form {
            SpecialForm::Bound => match args.first() {
                Some(Expression::Variable(name)) => Ok(bool_term(bindings.contains(name))),
                _ => Err(EvalError::malformed("BOUND requires a variable")),
            },
            SpecialForm::If => {
                let branch = if self.eval_ebv(&args[0], bindings)? { &args[1] } else { &args[2] };
                self.eval(branch, bindings)
            }
            SpecialForm::Coalesce => self.eval_coalesce(args, bindings),
            SpecialForm::LogicalOr => {
                let left = catch(self.eval_ebv(&args[0], bindings))?;
                if matches!(left, Ok(true)) {
                    return Ok(bool_term(true));
                }
                let right = catch(self.eval_ebv(&args[1], bindings))?;
                combine_or(left, right).map(bool_term)
            }
            SpecialForm::LogicalAnd => {
                let left = catch(self.eval_ebv(&args[0], bindings))?;
                if matches!(left, Ok(false)) {
                    return Ok(bool_term(false));
                }
                let right = catch(self.eval_ebv(&args[1], bindings))?;
                combine_and(left, right).map(bool_term)
            }
            SpecialForm::SameTerm => {
                let left = self.eval(&args[0], bindings)?;
                let right = self.eval(&args[1], bindings)?;
                Ok(bool_term(left.same_term(&right)))
            }
            SpecialForm::In => self.eval_in(args, bindings).map(bool_term),
            SpecialForm::NotIn => self.eval_in(args, bindings).map(|found| bool_term(!found)),
            SpecialForm::Concat => special::concat(&self.eval_args(args, bindings)?),
            SpecialForm::Bnode => {
                let seed = match args.first() {
                    Some(arg) => Some(self.eval(arg, bindings)?),
                    None => None,
                };
                let seed = special::bnode_seed(seed.as_ref())?;
                let id = match &self.context.hooks.bnode {
                    Some(generate) => generate(seed.as_deref()),
                    None => default_bnode(seed.as_deref()),
                };
                Ok(Term::blank_node(id))
            }
        }
    }

    fn eval_coalesce(&self, args: &[Expression], bindings: &Bindings) -> EvalResult<Term> {
        let mut errors = Vec::new();
        for arg in args {
            match catch(self.eval(arg, bindings))? {
                Ok(term) => return Ok(term),
                Err(error) => errors.push(error),
            }
        }
        Err(special::coalesce_failed(errors))
    }

    fn eval_in(&self, args: &[Expression], bindings: &Bindings) -> EvalResult<bool> {
        let needle = self.eval(&args[0], bindings)?;
        let ctx = self.context.function_context();
        let mut errors = Vec::new();
        for arg in &args[1..] {
            let outcome = self
                .eval(arg, bindings)
                .and_then(|candidate| ctx.functions.test("=", &[needle.clone(), candidate], &ctx));
            match catch(outcome)? {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(error) => errors.push(error),
            }
        }
        special::in_result(errors)
    }
}
