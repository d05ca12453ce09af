//! Special Form Tests
//!
//! Tests for: BOUND, IF, COALESCE, ||, &&, sameTerm, IN, NOT IN, CONCAT, BNODE
//! The logical forms intercept expression errors and apply three-valued logic

mod common;

use common::{boolean, double, eval, eval_with, int, iri, lang, op, string, var};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sparql_expr_eval::{Algebra, Bindings, EvalError, EvaluatorBuilder, Pattern};
use sparql_expr_types::{Literal, Term};

// ============================================================================
// Test Helpers
// ============================================================================

/// Operand whose effective boolean value cannot be computed
fn invalid_ebv() -> Algebra {
    iri("http://example.org/not-a-boolean")
}

fn truth(algebra: &Algebra) -> Result<bool, EvalError> {
    eval(algebra).map(|term| term.str() == "true")
}

// ============================================================================
// Logical Or / And
// ============================================================================

#[rstest]
#[case(boolean(true), invalid_ebv(), Some(true))]
#[case(invalid_ebv(), boolean(true), Some(true))]
#[case(boolean(false), boolean(false), Some(false))]
#[case(boolean(false), invalid_ebv(), None)]
#[case(invalid_ebv(), boolean(false), None)]
#[case(invalid_ebv(), invalid_ebv(), None)]
fn test_or(#[case] left: Algebra, #[case] right: Algebra, #[case] expected: Option<bool>) {
    assert_eq!(truth(&op("||", vec![left, right])).ok(), expected);
}

#[rstest]
#[case(boolean(false), invalid_ebv(), Some(false))]
#[case(invalid_ebv(), boolean(false), Some(false))]
#[case(boolean(true), boolean(true), Some(true))]
#[case(boolean(true), invalid_ebv(), None)]
#[case(invalid_ebv(), boolean(true), None)]
fn test_and(#[case] left: Algebra, #[case] right: Algebra, #[case] expected: Option<bool>) {
    assert_eq!(truth(&op("&&", vec![left, right])).ok(), expected);
}

#[test]
fn test_or_reports_the_ebv_error() {
    let result = eval(&op("||", vec![boolean(false), invalid_ebv()]));
    assert!(matches!(result, Err(EvalError::EbvCoercion { .. })));
}

#[test]
fn test_or_short_circuits() {
    // no existence capability is configured: evaluating it is a fatal error
    let exists = Algebra::Existence {
        not: false,
        input: Pattern::labelled("p"),
    };
    assert!(truth(&op("||", vec![boolean(true), exists.clone()])).unwrap());
    assert!(!truth(&op("&&", vec![boolean(false), exists.clone()])).unwrap());
    assert!(matches!(
        eval(&op("||", vec![boolean(false), exists])),
        Err(EvalError::MissingCapability { .. })
    ));
}

#[test]
fn test_logic_uses_ebv_of_operands() {
    assert!(truth(&op("&&", vec![string("x"), int(2)])).unwrap());
    assert!(!truth(&op("||", vec![string(""), double(0.0)])).unwrap());
}

// ============================================================================
// BOUND / IF / COALESCE
// ============================================================================

#[test]
fn test_bound() {
    let algebra = op("bound", vec![var("x")]);
    let bound = Bindings::new().with("x", Literal::integer(1));
    assert_eq!(eval_with(EvaluatorBuilder::new(), &algebra, &bound).unwrap().str(), "true");
    assert_eq!(eval(&algebra).unwrap().str(), "false");
}

#[test]
fn test_if() {
    let algebra = |condition| op("if", vec![condition, string("yes"), string("no")]);
    assert_eq!(eval(&algebra(int(1))).unwrap().str(), "yes");
    assert_eq!(eval(&algebra(string(""))).unwrap().str(), "no");
    assert!(matches!(
        eval(&algebra(invalid_ebv())),
        Err(EvalError::EbvCoercion { .. })
    ));
}

#[test]
fn test_if_only_evaluates_the_taken_branch() {
    let algebra = op("if", vec![boolean(true), int(1), op("/", vec![int(1), int(0)])]);
    assert_eq!(eval(&algebra).unwrap().str(), "1");
}

#[test]
fn test_coalesce() {
    let algebra = op("coalesce", vec![var("a"), op("/", vec![int(1), int(0)]), int(3)]);
    assert_eq!(eval(&algebra).unwrap().str(), "3");

    let failing = op("coalesce", vec![var("a"), var("b")]);
    match eval(&failing) {
        Err(EvalError::Coalesce { errors }) => assert_eq!(errors.0.len(), 2),
        other => panic!("expected a COALESCE error, got {:?}", other),
    }
}

// ============================================================================
// sameTerm / IN / NOT IN
// ============================================================================

#[test]
fn test_same_term_is_not_value_equality() {
    assert!(truth(&op("sameterm", vec![int(1), int(1)])).unwrap());
    assert!(!truth(&op("sameTerm", vec![int(1), double(1.0)])).unwrap());
    assert!(truth(&op("=", vec![int(1), double(1.0)])).unwrap());
}

#[rstest]
#[case(vec![int(2), int(1), int(2)], Some(true))]
#[case(vec![int(2), int(1), int(3)], Some(false))]
#[case(vec![int(2)], Some(false))]
#[case(vec![int(2), var("unbound"), int(2)], Some(true))]
#[case(vec![int(2), var("unbound"), int(3)], None)]
#[case(vec![int(2), string("2")], None)]
fn test_in(#[case] args: Vec<Algebra>, #[case] expected: Option<bool>) {
    assert_eq!(truth(&op("in", args.clone())).ok(), expected);
    assert_eq!(truth(&op("notin", args)).ok(), expected.map(|found| !found));
}

#[test]
fn test_in_collects_errors() {
    let result = eval(&op("in", vec![int(2), var("a"), var("b")]));
    match result {
        Err(EvalError::InError { errors }) => assert_eq!(errors.0.len(), 2),
        other => panic!("expected an IN error, got {:?}", other),
    }
}

// ============================================================================
// CONCAT / BNODE
// ============================================================================

#[test]
fn test_concat() {
    let shared = eval(&op("concat", vec![lang("a", "en"), lang("b", "en")])).unwrap();
    assert_eq!(shared, Term::from(Literal::lang_string("ab", "en")));

    let mixed = eval(&op("concat", vec![lang("a", "en"), string("b")])).unwrap();
    assert_eq!(mixed, Term::from(Literal::string("ab")));

    assert!(matches!(
        eval(&op("concat", vec![string("a"), int(1)])),
        Err(EvalError::InvalidArgumentTypes { .. })
    ));
}

#[test]
fn test_bnode_seed_must_be_a_plain_string() {
    assert_eq!(eval(&op("bnode", vec![string("x")])).unwrap(), Term::blank_node("x"));
    assert!(eval(&op("bnode", vec![int(1)])).is_err());
}
