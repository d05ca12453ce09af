//! Builder for regular function overloads
//!
//! Wraps an [`OverloadTree`] with typed registration helpers so catalog entries can be
//! written against literals and terms instead of raw argument slices.

use crate::context::FunctionContext;
use crate::error::{EvalError, EvalResult};
use crate::registry::{ArgumentType, Arity, ImplementationFn, OverloadTree, RegularFunction};
use sparql_expr_types::{Literal, Term};
use std::sync::Arc;

pub struct OverloadBuilder {
    name: String,
    arity: Arity,
    tree: OverloadTree,
}

/// Literal argument at `position`
pub fn literal_arg<'a>(name: &str, args: &'a [Term], position: usize) -> EvalResult<&'a Literal> {
    args.get(position)
        .and_then(Term::as_literal)
        .ok_or_else(|| EvalError::invalid_argument_types(name, args))
}

impl OverloadBuilder {
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
            tree: OverloadTree::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a raw implementation
    pub fn set<F>(mut self, types: &[ArgumentType], implementation: F) -> Self
    where
        F: Fn(&[Term], &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        let implementation: ImplementationFn = Arc::new(implementation);
        self.tree.add_overload(types, implementation);
        self
    }

    /// One argument of any term type
    pub fn on_term1<F>(self, f: F) -> Self
    where
        F: Fn(&Term, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        self.set(&[ArgumentType::Term], move |args, ctx| f(&args[0], ctx))
    }

    /// Two arguments of any term type
    pub fn on_term2<F>(self, f: F) -> Self
    where
        F: Fn(&Term, &Term, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        self.set(&[ArgumentType::Term, ArgumentType::Term], move |args, ctx| {
            f(&args[0], &args[1], ctx)
        })
    }

    /// One literal argument of type `ty`
    pub fn on_unary<F>(self, ty: impl Into<ArgumentType>, f: F) -> Self
    where
        F: Fn(&Literal, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.set(&[ty.into()], move |args, ctx| f(literal_arg(&name, args, 0)?, ctx))
    }

    /// Two literal arguments
    pub fn on_binary<F>(self, left: impl Into<ArgumentType>, right: impl Into<ArgumentType>, f: F) -> Self
    where
        F: Fn(&Literal, &Literal, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.set(&[left.into(), right.into()], move |args, ctx| {
            f(literal_arg(&name, args, 0)?, literal_arg(&name, args, 1)?, ctx)
        })
    }

    /// Three literal arguments
    pub fn on_ternary<F>(
        self,
        types: [ArgumentType; 3],
        f: F,
    ) -> Self
    where
        F: Fn(&Literal, &Literal, &Literal, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.set(&types, move |args, ctx| {
            f(
                literal_arg(&name, args, 0)?,
                literal_arg(&name, args, 1)?,
                literal_arg(&name, args, 2)?,
                ctx,
            )
        })
    }

    /// Register the same binary implementation for several type pairs
    pub fn on_binary_each<F>(mut self, pairs: &[(&str, &str)], f: F) -> Self
    where
        F: Fn(&Literal, &Literal, &FunctionContext<'_>) -> EvalResult<Term> + Send + Sync + Clone + 'static,
    {
        for (left, right) in pairs {
            self = self.on_binary(*left, *right, f.clone());
        }
        self
    }

    pub fn build(self) -> RegularFunction {
        RegularFunction::new(self.name, self.arity, self.tree)
    }
}

/// Boolean result term
pub fn bool_term(value: bool) -> Term {
    Term::from(Literal::boolean(value))
}
