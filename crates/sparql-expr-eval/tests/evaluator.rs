//! Synchronous Evaluator Tests
//!
//! Tests for: variables, operator dispatch, named functions and casts, extension
//! functions, existence checks, aggregate and blank node capabilities, configuration

mod common;

use chrono::DateTime;
use common::{
    boolean, decimal, double, eval, eval_with, exists_if_bound, failing_extension, int, iri, lang, named, op, string,
    typed, upper_extension, var,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sparql_expr_eval::expression::{AggregateExpression, Pattern};
use sparql_expr_eval::{
    Algebra, Bindings, EvalError, EvalResult, EvaluatorBuilder, EvaluatorOptions, ExtensionResolver, SyncEvaluator,
};
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{Literal, Term, TimeZone};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn lexical(algebra: &Algebra) -> String {
    eval(algebra).unwrap().str()
}

fn literal(algebra: &Algebra) -> Literal {
    match eval(algebra).unwrap() {
        Term::Literal(literal) => literal,
        other => panic!("expected a literal, got {}", other),
    }
}

fn with_extensions() -> EvaluatorBuilder {
    let resolver: ExtensionResolver = Arc::new(|iri: &str| match iri {
        "http://example.org/upper" => Some(upper_extension()),
        "http://example.org/fail" => Some(failing_extension()),
        _ => None,
    });
    EvaluatorBuilder::new().extension_resolver(resolver)
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_bound_variable() {
    let bindings = Bindings::new().with("x", Literal::integer(4));
    let result = eval_with(EvaluatorBuilder::new(), &op("*", vec![var("x"), int(2)]), &bindings).unwrap();
    assert_eq!(result.str(), "8");
}

#[test]
fn test_unbound_variable() {
    assert!(matches!(
        eval(&op("str", vec![var("missing")])),
        Err(EvalError::UnboundVariable { name }) if name == "missing"
    ));
}

#[test]
fn test_raw_bindings_are_typed() {
    let bindings = Bindings::new().with("x", Literal::other("41", xsd::INTEGER));
    let result = eval_with(EvaluatorBuilder::new(), &op("+", vec![var("x"), int(1)]), &bindings).unwrap();
    assert_eq!(result, Term::from(Literal::integer(42).with_lexical("42")));
}

#[test]
fn test_subtypes_keep_dispatching_as_numbers() {
    let result = literal(&op("+", vec![typed("3", xsd::BYTE), typed("4", xsd::SHORT)]));
    assert_eq!(result.str(), "7");
    assert_eq!(result.datatype, xsd::INTEGER);
}

// ============================================================================
// Operators
// ============================================================================

#[rstest]
#[case(op("+", vec![int(0), double(1.0)]), "1.0E0", xsd::DOUBLE)]
#[case(op("+", vec![int(1), decimal("0.5")]), "1.5", xsd::DECIMAL)]
#[case(op("/", vec![int(1), int(4)]), "0.25", xsd::DECIMAL)]
#[case(op("-", vec![int(3)]), "-3", xsd::INTEGER)]
#[case(op("strlen", vec![lang("chat", "fr")]), "4", xsd::INTEGER)]
#[case(op("ucase", vec![string("abc")]), "ABC", xsd::STRING)]
#[case(op("=", vec![int(1), double(1.0)]), "true", xsd::BOOLEAN)]
#[case(op("<", vec![string("a"), string("b")]), "true", xsd::BOOLEAN)]
#[case(op("!", vec![string("")]), "true", xsd::BOOLEAN)]
#[case(op("datatype", vec![int(1)]), xsd::INTEGER, "")]
fn test_operators(#[case] algebra: Algebra, #[case] expected: &str, #[case] datatype: &str) {
    let result = eval(&algebra).unwrap();
    assert_eq!(result.str(), expected);
    if let Some(literal) = result.as_literal() {
        assert_eq!(literal.datatype, datatype);
    }
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval(&op("/", vec![int(1), int(0)])), Err(EvalError::DivisionByZero)));
    assert_eq!(lexical(&op("/", vec![double(1.0), double(0.0)])), "INF");
}

#[test]
fn test_invalid_argument_types() {
    assert!(matches!(
        eval(&op("+", vec![int(1), string("1")])),
        Err(EvalError::InvalidArgumentTypes { .. })
    ));
}

#[test]
fn test_non_lexical_literals() {
    let bad = typed("abc", xsd::INTEGER);
    assert!(matches!(eval(&op("+", vec![bad.clone(), int(1)])), Err(_)));
    assert_eq!(lexical(&op("str", vec![bad.clone()])), "abc");
    assert_eq!(lexical(&op("!", vec![bad])), "true");
}

#[test]
fn test_equality_of_unknown_datatypes() {
    let a = typed("a", "http://example.org/custom");
    let b = typed("b", "http://example.org/custom");
    assert_eq!(lexical(&op("=", vec![a.clone(), a.clone()])), "true");
    assert!(matches!(eval(&op("=", vec![a, b])), Err(EvalError::RdfEqualType { .. })));
}

#[test]
fn test_regex_and_replace() {
    let matched = op("regex", vec![string("Alice"), string("^ali"), string("i")]);
    assert_eq!(lexical(&matched), "true");
    let replaced = op("replace", vec![string("abcd"), string("(b)(c)"), string("$2$1")]);
    assert_eq!(lexical(&replaced), "acbd");
}

#[test]
fn test_iri_resolution_uses_base() {
    let builder = EvaluatorBuilder::new().base_iri("http://example.org/base/");
    let result = eval_with(builder, &op("iri", vec![string("thing")]), &Bindings::new()).unwrap();
    assert_eq!(result, Term::named_node("http://example.org/base/thing"));
    assert_eq!(eval(&op("iri", vec![iri("http://a/b")])).unwrap(), Term::named_node("http://a/b"));
}

// ============================================================================
// Named functions and casts
// ============================================================================

#[rstest]
#[case(xsd::INTEGER, string(" 12 "), "12")]
#[case(xsd::DOUBLE, int(1), "1.0E0")]
#[case(xsd::BOOLEAN, string("1"), "true")]
#[case(xsd::STRING, double(2.5), "2.5E0")]
#[case(xsd::DECIMAL, boolean(true), "1")]
#[case(xsd::DATE_TIME, string("2020-01-02T03:04:05Z"), "2020-01-02T03:04:05Z")]
fn test_casts(#[case] target: &str, #[case] arg: Algebra, #[case] expected: &str) {
    let result = literal(&named(target, vec![arg]));
    assert_eq!(result.str(), expected);
    assert_eq!(result.datatype, target);
}

#[test]
fn test_invalid_cast() {
    assert!(matches!(
        eval(&named(xsd::INTEGER, vec![string("twelve")])),
        Err(EvalError::CastError { .. }) | Err(EvalError::InvalidLexicalForm { .. })
    ));
}

#[test]
fn test_unknown_named_function_is_a_definition_error() {
    let result = EvaluatorBuilder::new().build_sync(&named("http://example.org/nope", vec![]));
    assert!(matches!(result, Err(EvalError::UnknownNamedFunction { .. })));
}

#[test]
fn test_extension_functions() {
    let upper = named("http://example.org/upper", vec![string("abc")]);
    let result = eval_with(with_extensions(), &upper, &Bindings::new()).unwrap();
    assert_eq!(result.str(), "ABC");

    let failing = named("http://example.org/fail", vec![]);
    let error = eval_with(with_extensions(), &failing, &Bindings::new()).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Error in extension function http://example.org/fail: extension exploded"
    );
}

#[test]
fn test_extension_errors_are_not_caught() {
    let guarded = op(
        "coalesce",
        vec![named("http://example.org/fail", vec![]), int(1)],
    );
    let result = eval_with(with_extensions(), &guarded, &Bindings::new());
    assert!(matches!(result, Err(EvalError::Extension { .. })));
}

#[test]
fn test_async_extension_rejected_in_sync_mode() {
    let builder = EvaluatorBuilder::new().async_extension_resolver(Arc::new(|_: &str| {
        Some(common::CountingExtension::default().function())
    }));
    let result = eval_with(builder, &named("http://example.org/slow", vec![]), &Bindings::new());
    assert!(matches!(result, Err(EvalError::UnsupportedInSyncMode { .. })));
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_existence() {
    let pattern = |not| Algebra::Existence {
        not,
        input: Pattern::labelled("x"),
    };
    let bound = Bindings::new().with("x", Literal::integer(1));
    let builder = || EvaluatorBuilder::new().exists(exists_if_bound());

    assert_eq!(eval_with(builder(), &pattern(false), &bound).unwrap().str(), "true");
    assert_eq!(eval_with(builder(), &pattern(true), &bound).unwrap().str(), "false");
    assert_eq!(eval_with(builder(), &pattern(true), &Bindings::new()).unwrap().str(), "true");
    assert!(matches!(
        eval(&pattern(false)),
        Err(EvalError::MissingCapability { .. })
    ));
}

#[test]
fn test_aggregate_hook() {
    let builder = EvaluatorBuilder::new().aggregate(Arc::new(|aggregate: &AggregateExpression| -> EvalResult<Term> {
        assert_eq!(aggregate.aggregator, "sum");
        Ok(Term::from(Literal::integer(10)))
    }));
    let algebra = op("*", vec![Algebra::aggregate("SUM", false, Some(var("x"))), int(2)]);
    assert_eq!(eval_with(builder, &algebra, &Bindings::new()).unwrap().str(), "20");
}

#[test]
fn test_bnode() {
    let builder = EvaluatorBuilder::new().bnode(Arc::new(|seed: Option<&str>| format!("gen-{}", seed.unwrap_or("x"))));
    let seeded = eval_with(builder, &op("bnode", vec![string("s")]), &Bindings::new()).unwrap();
    assert_eq!(seeded, Term::blank_node("gen-s"));

    let first = eval(&op("bnode", vec![])).unwrap();
    let second = eval(&op("bnode", vec![])).unwrap();
    assert_ne!(first, second);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_now_is_fixed_per_builder() {
    let now = DateTime::parse_from_rfc3339("2024-02-29T12:30:00+01:00").unwrap();
    let builder = EvaluatorBuilder::new().now(now);
    let evaluator: SyncEvaluator = builder.build_sync(&op("year", vec![op("now", vec![])])).unwrap();
    assert_eq!(evaluator.evaluate(&Bindings::new()).unwrap().str(), "2024");
    assert_eq!(evaluator.context().shared.default_timezone, TimeZone::new(1, 0));
}

#[test]
fn test_options_from_json() {
    let options = EvaluatorOptions::from_json(r#"{"base_iri": "http://example.org/"}"#).unwrap();
    let builder = EvaluatorBuilder::new().with_options(&options).unwrap();
    let result = eval_with(builder, &op("iri", vec![string("a")]), &Bindings::new()).unwrap();
    assert_eq!(result, Term::named_node("http://example.org/a"));
}

#[test]
fn test_evaluate_as_ebv() {
    let evaluator = EvaluatorBuilder::new().build_sync(&var("x")).unwrap();
    let bindings = Bindings::new().with("x", Literal::string("non-empty"));
    assert!(evaluator.evaluate_as_ebv(&bindings).unwrap());
    let bindings = Bindings::new().with("x", Term::named_node("http://example.org/a"));
    assert!(matches!(
        evaluator.evaluate_as_ebv(&bindings),
        Err(EvalError::EbvCoercion { .. })
    ));
}

#[test]
fn test_open_world_types() {
    let builder = EvaluatorBuilder::new().type_discoverer(Arc::new(|iri: &str| {
        if iri == "http://example.org/age" {
            xsd::INTEGER.to_string()
        } else {
            sparql_expr_types::TERM.to_string()
        }
    }));
    let algebra = op("+", vec![typed("30", "http://example.org/age"), int(1)]);
    assert_eq!(eval_with(builder, &algebra, &Bindings::new()).unwrap().str(), "31");
}
