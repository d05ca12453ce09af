//! Term accessors and constructors
//!
//! Implements: STR, LANG, DATATYPE, IRI/URI, isIRI/isURI, isBlank, isLiteral, isNumeric,
//! STRDT, STRLANG.

use crate::error::{EvalError, EvalResult};
use crate::overloads::{OverloadBuilder, bool_term};
use crate::registry::{ArgumentType, Arity, FunctionRegistry};
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{Literal, Term, TermKind, TermTransformer};

fn string_term(value: impl Into<String>) -> Term {
    Term::from(Literal::string(value))
}

fn has_scheme(iri: &str) -> bool {
    match iri.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolve a possibly relative IRI reference against `base`
pub(crate) fn resolve_iri(reference: &str, base: Option<&str>) -> EvalResult<String> {
    if has_scheme(reference) {
        return Ok(reference.to_string());
    }
    let Some(base) = base else {
        return Err(EvalError::InvalidIri {
            iri: reference.to_string(),
        });
    };
    if reference.is_empty() {
        return Ok(base.split('#').next().unwrap_or(base).to_string());
    }
    if reference.starts_with('#') {
        let document = base.split('#').next().unwrap_or(base);
        return Ok(format!("{}{}", document, reference));
    }
    if reference.starts_with("//") {
        let scheme = base.split(':').next().unwrap_or_default();
        return Ok(format!("{}:{}", scheme, reference));
    }
    let authority_end = base
        .find("://")
        .map(|start| start + 3)
        .map(|start| base[start..].find('/').map_or(base.len(), |i| start + i))
        .unwrap_or(0);
    if reference.starts_with('/') {
        return Ok(format!("{}{}", &base[..authority_end], reference));
    }
    let path = base.split(['?', '#']).next().unwrap_or(base);
    let directory = match path.rfind('/') {
        Some(index) if index >= authority_end => &path[..=index],
        _ => return Ok(format!("{}/{}", path, reference)),
    };
    Ok(format!("{}{}", directory, reference))
}

/// RFC 4647 basic filtering of a language tag against a language range
pub(crate) fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_lowercase();
    let range = range.to_lowercase();
    tag == range || tag.strip_prefix(&range).is_some_and(|rest| rest.starts_with('-'))
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_operator(
        OverloadBuilder::new("str", Arity::Exact(1))
            .on_unary(TermKind::Literal, |a, _| Ok(string_term(a.str())))
            .on_term1(|a, _| match a {
                Term::NamedNode(iri) => Ok(string_term(iri.as_str())),
                other => Err(EvalError::invalid_argument_types("str", [other])),
            })
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("lang", Arity::Exact(1))
            .on_unary(TermKind::Literal, |a, _| {
                Ok(string_term(a.language.clone().unwrap_or_default()))
            })
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("datatype", Arity::Exact(1))
            .on_unary(TermKind::Literal, |a, _| Ok(Term::named_node(a.datatype.as_str())))
            .build(),
    );

    for name in ["iri", "uri"] {
        registry.register_operator(
            OverloadBuilder::new(name, Arity::Exact(1))
                .set(&[TermKind::NamedNode.into()], |args, _| Ok(args[0].clone()))
                .on_unary(xsd::STRING, |a, ctx| {
                    let reference = a.str();
                    Ok(Term::named_node(resolve_iri(&reference, ctx.shared.base_iri.as_deref())?))
                })
                .build(),
        );
    }

    for name in ["isiri", "isuri"] {
        registry.register_operator(
            OverloadBuilder::new(name, Arity::Exact(1))
                .on_term1(|a, _| Ok(bool_term(a.kind() == TermKind::NamedNode)))
                .build(),
        );
    }
    registry.register_operator(
        OverloadBuilder::new("isblank", Arity::Exact(1))
            .on_term1(|a, _| Ok(bool_term(a.kind() == TermKind::BlankNode)))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("isliteral", Arity::Exact(1))
            .on_term1(|a, _| Ok(bool_term(a.kind() == TermKind::Literal)))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("isnumeric", Arity::Exact(1))
            .on_term1(|a, _| Ok(bool_term(a.as_literal().is_some_and(Literal::is_numeric))))
            .build(),
    );

    registry.register_operator(
        OverloadBuilder::new("strdt", Arity::Exact(2))
            .set(
                &[ArgumentType::literal(xsd::STRING), TermKind::NamedNode.into()],
                |args, ctx| match (&args[0], &args[1]) {
                    (Term::Literal(lexical), Term::NamedNode(datatype)) => {
                        let transformer = TermTransformer::new(&ctx.shared.lattice);
                        Ok(Term::from(transformer.transform_literal(&lexical.str(), datatype, None)))
                    }
                    _ => Err(EvalError::invalid_argument_types("strdt", args)),
                },
            )
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("strlang", Arity::Exact(2))
            .on_binary(xsd::STRING, xsd::STRING, |value, language, _| {
                let tag = language.str();
                if tag.is_empty() {
                    return Err(EvalError::invalid_argument_types(
                        "strlang",
                        [&Term::from(value.clone()), &Term::from(language.clone())],
                    ));
                }
                Ok(Term::from(Literal::lang_string(value.str(), tag)))
            })
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FunctionContext, SharedContext};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sparql_expr_types::LiteralValue;

    fn apply_with(shared: &SharedContext, name: &str, args: &[Term]) -> EvalResult<Term> {
        let registry = FunctionRegistry::with_standard_functions();
        let ctx = FunctionContext {
            shared,
            functions: &registry,
        };
        registry.apply(name, args, &ctx)
    }

    fn apply(name: &str, args: &[Term]) -> EvalResult<Term> {
        apply_with(&SharedContext::new(), name, args)
    }

    #[rstest]
    #[case("b", "http://example.org/a/b")]
    #[case("../c", "http://example.org/a/../c")]
    #[case("/root", "http://example.org/root")]
    #[case("#frag", "http://example.org/a/doc#frag")]
    #[case("urn:x", "urn:x")]
    fn test_resolve_iri(#[case] reference: &str, #[case] expected: &str) {
        let resolved = resolve_iri(reference, Some("http://example.org/a/doc")).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_relative_iri_without_base() {
        let err = apply("iri", &[Term::from(Literal::string("relative"))]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidIri { .. }));
    }

    #[test]
    fn test_iri_uses_base() {
        let mut shared = SharedContext::new();
        shared.base_iri = Some("http://example.org/".to_string());
        let result = apply_with(&shared, "IRI", &[Term::from(Literal::string("x"))]).unwrap();
        assert_eq!(result, Term::named_node("http://example.org/x"));
    }

    #[rstest]
    #[case("en-US", "en", true)]
    #[case("en", "EN", true)]
    #[case("english", "en", false)]
    #[case("fr", "*", true)]
    #[case("", "*", false)]
    fn test_lang_matches(#[case] tag: &str, #[case] range: &str, #[case] expected: bool) {
        assert_eq!(lang_matches(tag, range), expected);
    }

    #[test]
    fn test_accessors() {
        let chat = Term::from(Literal::lang_string("chat", "FR"));
        assert_eq!(apply("lang", &[chat.clone()]).unwrap().str(), "fr");
        assert_eq!(apply("str", &[chat.clone()]).unwrap().str(), "chat");
        assert_eq!(
            apply("datatype", &[chat]).unwrap(),
            Term::named_node(sparql_expr_types::vocab::rdf::LANG_STRING)
        );
        assert_eq!(apply("str", &[Term::named_node("http://ex/a")]).unwrap().str(), "http://ex/a");
        assert!(apply("str", &[Term::blank_node("b0")]).is_err());
    }

    #[test]
    fn test_strdt_types_the_lexical_form() {
        let result = apply(
            "strdt",
            &[Term::from(Literal::string("12")), Term::named_node(xsd::BYTE)],
        )
        .unwrap();
        let literal = result.as_literal().unwrap();
        assert_eq!(literal.value, LiteralValue::Integer(12));
        assert_eq!(literal.datatype, xsd::BYTE);
    }

    #[test]
    fn test_kind_tests() {
        let blank = Term::blank_node("b0");
        assert_eq!(apply("isblank", &[blank.clone()]).unwrap().str(), "true");
        assert_eq!(apply("isiri", &[blank]).unwrap().str(), "false");
        assert_eq!(
            apply("isnumeric", &[Term::from(Literal::non_lexical("x", xsd::INTEGER, None, true))])
                .unwrap()
                .str(),
            "false"
        );
    }
}
