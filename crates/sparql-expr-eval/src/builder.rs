//! Expression resolution and evaluator construction
//!
//! [`ExpressionBuilder`] turns caller [`Algebra`] into a resolved [`Expression`]:
//! operator names are looked up once, arities are checked and named functions are bound
//! to a cast, a synchronous extension or a suspending extension. Every error raised here
//! is a definition error.
//!
//! [`EvaluatorBuilder`] collects the shared values and capabilities and produces the
//! synchronous, asynchronous and aggregate evaluators.

use crate::aggregate::{AggregateEvaluator, AggregatorKind};
use crate::async_engine::AsyncEvaluator;
use crate::context::{
    AggregateHook, AsyncExtensionResolver, AsyncHooks, BnodeHook, EvaluatorContext, EvaluatorOptions,
    ExistenceHook, ExtensionResolver, SharedContext, SyncHooks,
};
use crate::engine::SyncEvaluator;
use crate::error::{EvalError, EvalResult};
use crate::expression::{
    AggregateExpression, Algebra, ExistenceExpression, Expression, ExtensionExpression, ExtensionFunction,
    NamedExpression, OperatorExpression, SpecialExpression, SpecialForm,
};
use crate::operators::string::RegexCache;
use crate::registry::{FunctionArgumentsCache, FunctionRegistry};
use chrono::{DateTime, FixedOffset, Local};
use log::debug;
use sparql_expr_types::{TermTransformer, TimeZone, TypeDiscoverer, TypeLattice};
use std::sync::Arc;

/// Resolves [`Algebra`] against a function catalog
pub struct ExpressionBuilder<'a> {
    functions: &'a FunctionRegistry,
    lattice: &'a TypeLattice,
    extension_resolver: Option<&'a ExtensionResolver>,
    async_extension_resolver: Option<&'a AsyncExtensionResolver>,
}

impl<'a> ExpressionBuilder<'a> {
    pub fn new(functions: &'a FunctionRegistry, lattice: &'a TypeLattice) -> Self {
        Self {
            functions,
            lattice,
            extension_resolver: None,
            async_extension_resolver: None,
        }
    }

    pub fn extension_resolver(mut self, resolver: Option<&'a ExtensionResolver>) -> Self {
        self.extension_resolver = resolver;
        self
    }

    pub fn async_extension_resolver(mut self, resolver: Option<&'a AsyncExtensionResolver>) -> Self {
        self.async_extension_resolver = resolver;
        self
    }

    /// Resolve a whole tree
    pub fn build(&self, algebra: &Algebra) -> EvalResult<Expression> {
        match algebra {
            Algebra::Term(term) => Ok(Expression::Term(
                TermTransformer::new(self.lattice).transform_term(term),
            )),
            Algebra::Variable(name) => Ok(Expression::Variable(name.clone())),
            Algebra::Operator { operator, args } => self.build_operator(operator, args),
            Algebra::Named { iri, args } => self.build_named(iri, args),
            Algebra::Existence { not, input } => Ok(Expression::Existence(ExistenceExpression {
                not: *not,
                pattern: input.clone(),
            })),
            Algebra::Aggregate {
                aggregator,
                distinct,
                separator,
                expression,
            } => {
                let name = aggregator.to_lowercase();
                let kind = AggregatorKind::from_name(&name).ok_or_else(|| EvalError::UnknownAggregator {
                    name: aggregator.clone(),
                })?;
                if expression.is_none() && kind != AggregatorKind::Count {
                    return Err(EvalError::malformed(format!("{} does not accept *", kind.name())));
                }
                let expression = expression
                    .as_deref()
                    .map(|inner| self.build(inner).map(Box::new))
                    .transpose()?;
                Ok(Expression::Aggregate(AggregateExpression {
                    aggregator: name,
                    distinct: *distinct,
                    separator: separator.clone(),
                    expression,
                }))
            }
        }
    }

    fn build_args(&self, args: &[Algebra]) -> EvalResult<Vec<Expression>> {
        args.iter().map(|arg| self.build(arg)).collect()
    }

    fn build_operator(&self, operator: &str, args: &[Algebra]) -> EvalResult<Expression> {
        let name = match (operator, args.len()) {
            ("-", 1) => "uminus".to_string(),
            ("+", 1) => "uplus".to_string(),
            _ => operator.to_lowercase(),
        };

        if let Some((form, arity)) = self.functions.special(&name) {
            if !arity.accepts(args.len()) {
                return Err(EvalError::invalid_arity(form.name(), arity, args.len()));
            }
            if form == SpecialForm::Bound && !matches!(args.first(), Some(Algebra::Variable(_))) {
                return Err(EvalError::malformed("BOUND requires a variable"));
            }
            return Ok(Expression::SpecialOperator(SpecialExpression {
                form,
                args: self.build_args(args)?,
            }));
        }

        let function = self
            .functions
            .operator(&name)
            .ok_or_else(|| EvalError::UnknownOperator {
                name: operator.to_string(),
            })?;
        if !function.arity().accepts(args.len()) {
            return Err(EvalError::invalid_arity(&name, function.arity(), args.len()));
        }
        Ok(Expression::Operator(OperatorExpression {
            name,
            args: self.build_args(args)?,
            function: Arc::clone(function),
        }))
    }

    fn build_named(&self, iri: &str, args: &[Algebra]) -> EvalResult<Expression> {
        if let Some(function) = self.functions.named(iri) {
            if !function.arity().accepts(args.len()) {
                return Err(EvalError::invalid_arity(iri, function.arity(), args.len()));
            }
            return Ok(Expression::Named(NamedExpression {
                iri: iri.to_string(),
                args: self.build_args(args)?,
                function: Arc::clone(function),
            }));
        }

        let function = if let Some(function) = self.extension_resolver.and_then(|resolve| resolve(iri)) {
            ExtensionFunction::Sync(function)
        } else if let Some(function) = self.async_extension_resolver.and_then(|resolve| resolve(iri)) {
            debug!("Bound <{}> to a suspending extension function", iri);
            ExtensionFunction::Async(function)
        } else {
            return Err(EvalError::UnknownNamedFunction { iri: iri.to_string() });
        };
        Ok(Expression::Extension(ExtensionExpression {
            iri: iri.to_string(),
            args: self.build_args(args)?,
            function,
        }))
    }
}

/// Builder for evaluators sharing one configuration
///
/// ```
/// use sparql_expr_eval::{Algebra, Bindings, EvaluatorBuilder};
/// use sparql_expr_types::Literal;
///
/// let algebra = Algebra::operator(
///     "+",
///     vec![Algebra::variable("x"), Algebra::term(Literal::integer(1))],
/// );
/// let evaluator = EvaluatorBuilder::new().build_sync(&algebra).unwrap();
/// let bindings = Bindings::new().with("x", Literal::integer(41));
/// assert_eq!(evaluator.evaluate(&bindings).unwrap().str(), "42");
/// ```
#[derive(Default)]
pub struct EvaluatorBuilder {
    now: Option<DateTime<FixedOffset>>,
    base_iri: Option<String>,
    default_timezone: Option<TimeZone>,
    type_discoverer: Option<TypeDiscoverer>,
    hooks: SyncHooks,
    async_hooks: Option<Arc<dyn AsyncHooks>>,
    extension_resolver: Option<ExtensionResolver>,
    async_extension_resolver: Option<AsyncExtensionResolver>,
    functions: Option<Arc<FunctionRegistry>>,
    strict_aggregates: bool,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply serializable options on top of the current settings
    pub fn with_options(mut self, options: &EvaluatorOptions) -> EvalResult<Self> {
        if let Some(base_iri) = &options.base_iri {
            self.base_iri = Some(base_iri.clone());
        }
        if let Some(timezone) = options.timezone()? {
            self.default_timezone = Some(timezone);
        }
        self.strict_aggregates = options.strict_aggregates;
        Ok(self)
    }

    /// Evaluation time returned by NOW()
    pub fn now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn base_iri(mut self, base_iri: impl Into<String>) -> Self {
        self.base_iri = Some(base_iri.into());
        self
    }

    /// Timezone assumed for values without one when comparing instants
    pub fn default_timezone(mut self, timezone: TimeZone) -> Self {
        self.default_timezone = Some(timezone);
        self
    }

    /// Resolver for datatypes missing from the lattice
    pub fn type_discoverer(mut self, discoverer: TypeDiscoverer) -> Self {
        self.type_discoverer = Some(discoverer);
        self
    }

    pub fn exists(mut self, hook: ExistenceHook) -> Self {
        self.hooks.exists = Some(hook);
        self
    }

    pub fn aggregate(mut self, hook: AggregateHook) -> Self {
        self.hooks.aggregate = Some(hook);
        self
    }

    pub fn bnode(mut self, hook: BnodeHook) -> Self {
        self.hooks.bnode = Some(hook);
        self
    }

    pub fn async_hooks(mut self, hooks: Arc<dyn AsyncHooks>) -> Self {
        self.async_hooks = Some(hooks);
        self
    }

    pub fn extension_resolver(mut self, resolver: ExtensionResolver) -> Self {
        self.extension_resolver = Some(resolver);
        self
    }

    pub fn async_extension_resolver(mut self, resolver: AsyncExtensionResolver) -> Self {
        self.async_extension_resolver = Some(resolver);
        self
    }

    /// Use a custom function catalog instead of the built-in one
    pub fn functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Report errors and empty groups from aggregates instead of leaving them unbound
    pub fn strict_aggregates(mut self, strict: bool) -> Self {
        self.strict_aggregates = strict;
        self
    }

    /// Shared context and catalog for a new evaluator
    pub fn context(&self) -> EvaluatorContext {
        let now = self.now.unwrap_or_else(|| Local::now().fixed_offset());
        let lattice = match &self.type_discoverer {
            Some(discoverer) => TypeLattice::with_discoverer(Arc::clone(discoverer)),
            None => TypeLattice::new(),
        };
        let shared = SharedContext {
            now,
            base_iri: self.base_iri.clone(),
            default_timezone: self
                .default_timezone
                .unwrap_or_else(|| TimeZone::from(*now.offset())),
            lattice: Arc::new(lattice),
            function_cache: Arc::new(FunctionArgumentsCache::new()),
            regex_cache: Arc::new(RegexCache::new()),
        };
        let functions = self
            .functions
            .clone()
            .unwrap_or_else(FunctionRegistry::standard);

        let mut context = EvaluatorContext::new(Arc::new(shared), functions);
        context.hooks = self.hooks.clone();
        if let Some(async_hooks) = &self.async_hooks {
            context.async_hooks = Arc::clone(async_hooks);
        }
        context
    }

    fn resolve(&self, algebra: &Algebra, context: &EvaluatorContext) -> EvalResult<Expression> {
        ExpressionBuilder::new(&context.functions, &context.shared.lattice)
            .extension_resolver(self.extension_resolver.as_ref())
            .async_extension_resolver(self.async_extension_resolver.as_ref())
            .build(algebra)
    }

    /// Evaluator without suspension points
    pub fn build_sync(&self, algebra: &Algebra) -> EvalResult<SyncEvaluator> {
        let context = self.context();
        let expression = self.resolve(algebra, &context)?;
        Ok(SyncEvaluator::new(expression, context))
    }

    /// Evaluator whose capabilities and extensions may suspend
    pub fn build_async(&self, algebra: &Algebra) -> EvalResult<AsyncEvaluator> {
        let context = self.context();
        let expression = self.resolve(algebra, &context)?;
        Ok(AsyncEvaluator::new(expression, context))
    }

    /// Accumulator for one aggregate call, `algebra` must be an aggregate node
    pub fn build_aggregate(&self, algebra: &Algebra) -> EvalResult<AggregateEvaluator> {
        let context = self.context();
        match self.resolve(algebra, &context)? {
            Expression::Aggregate(aggregate) => AggregateEvaluator::new(&aggregate, context, self.strict_aggregates),
            other => Err(EvalError::malformed(format!(
                "expected an aggregate, found a {} node",
                other.kind_name()
            ))),
        }
    }
}
