//! Aggregate accumulation
//!
//! One [`AggregateEvaluator`] serves one aggregate call over one group. Rows (or
//! already evaluated terms) are fed in with the `put_*` methods and the value is read
//! with [`AggregateEvaluator::result`].
//!
//! The first expression error marks the accumulator as failed and later puts are
//! ignored. In lenient mode a failed or empty aggregate has no value (empty groups get
//! the aggregator's default); in strict mode the stored error, or an empty aggregate
//! error, is returned instead.

use crate::async_engine::AsyncEvaluator;
use crate::context::{Bindings, EvaluatorContext, FunctionContext};
use crate::engine::{SyncEvaluator, to_rdf};
use crate::error::{EvalError, EvalResult};
use crate::expression::AggregateExpression;
use crate::ordering::order_terms;
use crate::special::catch;
use log::{trace, warn};
use sparql_expr_types::{Literal, Term};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Separator of GROUP_CONCAT without an explicit one
pub const DEFAULT_SEPARATOR: &str = " ";

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregatorKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Sample,
    GroupConcat,
}

impl AggregatorKind {
    /// Aggregator for a lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "min" => Self::Min,
            "max" => Self::Max,
            "avg" => Self::Avg,
            "sample" => Self::Sample,
            "group_concat" => Self::GroupConcat,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Sample => "sample",
            Self::GroupConcat => "group_concat",
        }
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    Count(i64),
    Sum(Option<Term>),
    Min(Option<Term>),
    Max(Option<Term>),
    Avg { sum: Option<Term>, count: i64 },
    Sample(Option<Term>),
    GroupConcat {
        values: Vec<String>,
        /// `None` before the first value, `Some(None)` once tags differ
        language: Option<Option<String>>,
    },
}

impl Accumulator {
    fn new(kind: AggregatorKind) -> Self {
        match kind {
            AggregatorKind::Count => Self::Count(0),
            AggregatorKind::Sum => Self::Sum(None),
            AggregatorKind::Min => Self::Min(None),
            AggregatorKind::Max => Self::Max(None),
            AggregatorKind::Avg => Self::Avg { sum: None, count: 0 },
            AggregatorKind::Sample => Self::Sample(None),
            AggregatorKind::GroupConcat => Self::GroupConcat {
                values: Vec::new(),
                language: None,
            },
        }
    }

    fn put(&mut self, term: &Term, name: &str, ctx: &FunctionContext<'_>) -> EvalResult<()> {
        match self {
            Self::Count(count) => {
                *count = count.checked_add(1).ok_or_else(|| EvalError::overflow(name))?;
            }
            Self::Sum(total) => {
                numeric(term, name)?;
                *total = Some(add(total.take(), term, ctx)?);
            }
            Self::Avg { sum, count } => {
                numeric(term, name)?;
                *sum = Some(add(sum.take(), term, ctx)?);
                *count += 1;
            }
            Self::Min(current) => keep_extreme(current, term, Ordering::Less, name, ctx)?,
            Self::Max(current) => keep_extreme(current, term, Ordering::Greater, name, ctx)?,
            Self::Sample(sample) => {
                if sample.is_none() {
                    *sample = Some(term.clone());
                }
            }
            Self::GroupConcat { values, language } => {
                let tag = term.as_literal().and_then(|l| l.language.clone());
                *language = Some(match language.take() {
                    None => tag,
                    Some(previous) if previous == tag => previous,
                    Some(_) => None,
                });
                values.push(term.str());
            }
        }
        Ok(())
    }
}

fn numeric(term: &Term, name: &str) -> EvalResult<()> {
    if term.as_literal().is_some_and(Literal::is_numeric) {
        Ok(())
    } else {
        Err(EvalError::invalid_argument_types(name, [term]))
    }
}

fn add(total: Option<Term>, term: &Term, ctx: &FunctionContext<'_>) -> EvalResult<Term> {
    match total {
        None => Ok(term.clone()),
        Some(total) => ctx.functions.apply("+", &[total, term.clone()], ctx),
    }
}

fn keep_extreme(
    current: &mut Option<Term>,
    term: &Term,
    wanted: Ordering,
    name: &str,
    ctx: &FunctionContext<'_>,
) -> EvalResult<()> {
    if term.as_literal().is_none() {
        return Err(EvalError::invalid_argument_types(name, [term]));
    }
    if current
        .as_ref()
        .is_none_or(|current| order_terms(Some(term), Some(current), ctx) == wanted)
    {
        *current = Some(term.clone());
    }
    Ok(())
}

/// Accumulator for one aggregate call
#[derive(Debug, Clone)]
pub struct AggregateEvaluator {
    kind: AggregatorKind,
    distinct: bool,
    separator: String,
    strict: bool,
    context: EvaluatorContext,
    evaluator: Option<SyncEvaluator>,
    async_evaluator: Option<AsyncEvaluator>,
    seen: HashSet<String>,
    state: Accumulator,
    empty: bool,
    error: Option<EvalError>,
}

impl AggregateEvaluator {
    pub fn new(aggregate: &AggregateExpression, context: EvaluatorContext, strict: bool) -> EvalResult<Self> {
        let kind = AggregatorKind::from_name(&aggregate.aggregator).ok_or_else(|| EvalError::UnknownAggregator {
            name: aggregate.aggregator.clone(),
        })?;
        let inner = aggregate.expression.as_deref().cloned();
        if inner.is_none() && kind != AggregatorKind::Count {
            return Err(EvalError::malformed(format!("{} does not accept *", kind.name())));
        }
        Ok(Self {
            kind,
            distinct: aggregate.distinct,
            separator: aggregate
                .separator
                .clone()
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
            strict,
            evaluator: inner.clone().map(|e| SyncEvaluator::new(e, context.clone())),
            async_evaluator: inner.map(|e| AsyncEvaluator::new(e, context.clone())),
            context,
            seen: HashSet::new(),
            state: Accumulator::new(kind),
            empty: true,
            error: None,
        })
    }

    pub fn kind(&self) -> AggregatorKind {
        self.kind
    }

    /// Whether an expression error has been recorded
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Value of an aggregate over an empty group
    pub fn empty_value(kind: AggregatorKind, strict: bool) -> EvalResult<Option<Term>> {
        if strict {
            return Err(EvalError::empty_aggregate(kind.name()));
        }
        Ok(match kind {
            AggregatorKind::Count | AggregatorKind::Sum | AggregatorKind::Avg => {
                Some(to_rdf(Term::from(Literal::integer(0))))
            }
            AggregatorKind::GroupConcat => Some(to_rdf(Term::from(Literal::string("")))),
            AggregatorKind::Min | AggregatorKind::Max | AggregatorKind::Sample => None,
        })
    }

    /// Feed one evaluated term
    pub fn put_term(&mut self, term: &Term) -> EvalResult<()> {
        if self.error.is_some() {
            return Ok(());
        }
        if self.distinct && !self.seen.insert(term.to_string()) {
            return Ok(());
        }
        self.empty = false;
        let ctx = self.context.function_context();
        let outcome = self.state.put(term, self.kind.name(), &ctx);
        self.record(outcome)
    }

    /// Feed one row, evaluating the aggregated expression synchronously
    pub fn put_bindings(&mut self, bindings: &Bindings) -> EvalResult<()> {
        if self.error.is_some() {
            return Ok(());
        }
        match self.evaluator.as_ref().map(|e| e.evaluate_as_internal(bindings)) {
            None => self.put_row(bindings),
            Some(Ok(term)) => self.put_term(&term),
            Some(Err(error)) => self.record(Err(error)),
        }
    }

    /// Feed one row, evaluating the aggregated expression with the suspending evaluator
    pub async fn put_bindings_async(&mut self, bindings: &Bindings) -> EvalResult<()> {
        if self.error.is_some() {
            return Ok(());
        }
        let outcome = match &self.async_evaluator {
            Some(evaluator) => Some(evaluator.evaluate_as_internal(bindings).await),
            None => None,
        };
        match outcome {
            None => self.put_row(bindings),
            Some(Ok(term)) => self.put_term(&term),
            Some(Err(error)) => self.record(Err(error)),
        }
    }

    // COUNT(*): the row itself is the value
    fn put_row(&mut self, bindings: &Bindings) -> EvalResult<()> {
        if self.distinct && !self.seen.insert(bindings.row_key()) {
            return Ok(());
        }
        self.empty = false;
        let ctx = self.context.function_context();
        let outcome = self.state.put(&Term::DefaultGraph, self.kind.name(), &ctx);
        self.record(outcome)
    }

    fn record(&mut self, outcome: EvalResult<()>) -> EvalResult<()> {
        if let Err(error) = catch(outcome)? {
            trace!("Aggregate {} failed: {}", self.kind.name(), error);
            self.error = Some(error);
        }
        Ok(())
    }

    /// Final value of the aggregate, `None` when it stays unbound
    pub fn result(&self) -> EvalResult<Option<Term>> {
        if let Some(error) = &self.error {
            return self.failed(error.clone());
        }
        if self.empty {
            return Self::empty_value(self.kind, self.strict);
        }
        let value = match &self.state {
            Accumulator::Count(count) => Some(Term::from(Literal::integer(*count))),
            Accumulator::Sum(value)
            | Accumulator::Min(value)
            | Accumulator::Max(value)
            | Accumulator::Sample(value) => value.clone(),
            Accumulator::Avg { sum, count } => match sum {
                Some(sum) => {
                    let ctx = self.context.function_context();
                    let divided = ctx
                        .functions
                        .apply("/", &[sum.clone(), Term::from(Literal::integer(*count))], &ctx);
                    match divided {
                        Ok(average) => Some(average),
                        Err(error) => return self.failed(error),
                    }
                }
                None => None,
            },
            Accumulator::GroupConcat { values, language } => {
                let joined = values.join(&self.separator);
                Some(Term::from(match language.clone().flatten() {
                    Some(tag) => Literal::lang_string(joined, tag),
                    None => Literal::string(joined),
                }))
            }
        };
        Ok(value.map(to_rdf))
    }

    fn failed(&self, error: EvalError) -> EvalResult<Option<Term>> {
        if self.strict || !error.is_expression_error() {
            return Err(error);
        }
        warn!("Aggregate {} left unbound after an error: {}", self.kind.name(), error);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EvaluatorBuilder;
    use crate::expression::Algebra;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn evaluator(name: &str, distinct: bool, strict: bool) -> AggregateEvaluator {
        EvaluatorBuilder::new()
            .strict_aggregates(strict)
            .build_aggregate(&Algebra::aggregate(name, distinct, Some(Algebra::variable("x"))))
            .unwrap()
    }

    fn feed(aggregate: &mut AggregateEvaluator, terms: &[Term]) {
        for term in terms {
            aggregate.put_term(term).unwrap();
        }
    }

    fn ints(values: &[i64]) -> Vec<Term> {
        values.iter().map(|v| Term::from(Literal::integer(*v))).collect()
    }

    fn lexical(term: Option<Term>) -> Option<String> {
        term.map(|t| t.str())
    }

    #[rstest]
    #[case("count", "4")]
    #[case("sum", "7")]
    #[case("min", "1")]
    #[case("max", "3")]
    #[case("sample", "1")]
    #[case("group_concat", "1 3 1 2")]
    fn test_integer_aggregates(#[case] name: &str, #[case] expected: &str) {
        let mut aggregate = evaluator(name, false, false);
        feed(&mut aggregate, &ints(&[1, 3, 1, 2]));
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some(expected));
    }

    #[test]
    fn test_avg_is_decimal() {
        let mut aggregate = evaluator("avg", false, false);
        feed(&mut aggregate, &ints(&[1, 2]));
        let result = aggregate.result().unwrap().unwrap();
        let literal = result.as_literal().unwrap();
        assert_eq!(literal.str(), "1.5");
        assert_eq!(literal.datatype, sparql_expr_types::vocab::xsd::DECIMAL);
    }

    #[test]
    fn test_sum_promotes() {
        let mut aggregate = evaluator("sum", false, false);
        feed(&mut aggregate, &[Term::from(Literal::integer(0)), Term::from(Literal::double(1.0))]);
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("1.0E0"));
    }

    #[test]
    fn test_distinct() {
        let mut aggregate = evaluator("count", true, false);
        feed(&mut aggregate, &ints(&[1, 1, 2, 2, 3]));
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("3"));

        let mut aggregate = evaluator("sum", true, false);
        feed(&mut aggregate, &ints(&[5, 5]));
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("5"));
    }

    #[test]
    fn test_min_over_strings_is_lexical() {
        let mut aggregate = evaluator("min", false, false);
        let terms: Vec<Term> = ["11", "2", "1", "3"]
            .iter()
            .map(|s| Term::from(Literal::string(*s)))
            .collect();
        feed(&mut aggregate, &terms);
        assert_eq!(aggregate.result().unwrap(), Some(Term::from(Literal::string("1"))));
    }

    #[rstest]
    #[case("count", Some("0"))]
    #[case("sum", Some("0"))]
    #[case("avg", Some("0"))]
    #[case("group_concat", Some(""))]
    #[case("min", None)]
    #[case("max", None)]
    #[case("sample", None)]
    fn test_empty_defaults(#[case] name: &str, #[case] expected: Option<&str>) {
        let aggregate = evaluator(name, false, false);
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), expected);
        let strict = evaluator(name, false, true);
        assert!(matches!(strict.result(), Err(EvalError::EmptyAggregate { .. })));
    }

    #[test]
    fn test_error_latches() {
        let mut aggregate = evaluator("sum", false, false);
        feed(
            &mut aggregate,
            &[Term::from(Literal::integer(1)), Term::named_node("http://example.org/a")],
        );
        assert!(aggregate.has_failed());
        feed(&mut aggregate, &ints(&[2]));
        assert_eq!(aggregate.result().unwrap(), None);

        let mut strict = evaluator("sum", false, true);
        feed(&mut strict, &[Term::from(Literal::string("a"))]);
        assert!(matches!(strict.result(), Err(EvalError::InvalidArgumentTypes { .. })));
    }

    #[test]
    fn test_min_rejects_iris() {
        let mut aggregate = evaluator("min", false, true);
        feed(&mut aggregate, &[Term::named_node("http://example.org/a")]);
        assert!(aggregate.result().is_err());
    }

    #[test]
    fn test_group_concat_languages() {
        let tagged = |value: &str, tag: &str| Term::from(Literal::lang_string(value, tag));

        let mut mixed = evaluator("group_concat", false, false);
        feed(&mut mixed, &[tagged("1", "en"), tagged("2", "nl"), tagged("3", "en"), tagged("4", "en")]);
        assert_eq!(mixed.result().unwrap(), Some(Term::from(Literal::string("1 2 3 4"))));

        let mut shared = evaluator("group_concat", false, false);
        feed(&mut shared, &[tagged("a", "en"), tagged("b", "en")]);
        assert_eq!(shared.result().unwrap(), Some(tagged("a b", "en")));
    }

    #[test]
    fn test_group_concat_separator() {
        let algebra = Algebra::Aggregate {
            aggregator: "GROUP_CONCAT".into(),
            distinct: false,
            separator: Some(", ".into()),
            expression: Some(Box::new(Algebra::variable("x"))),
        };
        let mut aggregate = EvaluatorBuilder::new().build_aggregate(&algebra).unwrap();
        feed(&mut aggregate, &ints(&[1, 2]));
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("1, 2"));
    }

    #[test]
    fn test_count_distinct_rows() {
        let mut aggregate = EvaluatorBuilder::new()
            .build_aggregate(&Algebra::aggregate("count", true, None))
            .unwrap();
        let rows = [
            Bindings::new().with("x", Literal::integer(1)),
            Bindings::new(),
            Bindings::new().with("y", Literal::integer(1)),
            Bindings::new(),
            Bindings::new().with("x", Literal::integer(2)),
        ];
        for row in &rows {
            aggregate.put_bindings(row).unwrap();
        }
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("4"));
    }

    #[test]
    fn test_unbound_rows_fail_the_group() {
        let mut aggregate = evaluator("max", false, false);
        aggregate
            .put_bindings(&Bindings::new().with("x", Literal::integer(1)))
            .unwrap();
        aggregate.put_bindings(&Bindings::new()).unwrap();
        assert!(aggregate.has_failed());
        assert_eq!(aggregate.result().unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_bindings_async() {
        let mut aggregate = evaluator("sum", false, false);
        for value in [1, 2, 3] {
            aggregate
                .put_bindings_async(&Bindings::new().with("x", Literal::integer(value)))
                .await
                .unwrap();
        }
        assert_eq!(lexical(aggregate.result().unwrap()).as_deref(), Some("6"));
    }
}
