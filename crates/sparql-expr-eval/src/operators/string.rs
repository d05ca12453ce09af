//! String functions
//!
//! Implements: STRLEN, SUBSTR, UCASE, LCASE, STRSTARTS, STRENDS, CONTAINS, STRBEFORE,
//! STRAFTER, ENCODE_FOR_URI, langMatches, REGEX, REPLACE.
//!
//! Functions that take two string arguments require them to be argument compatible:
//! both plain, both tagged with the same language, or a tagged first argument with a
//! plain second one. String results keep the language tag of the first argument.

use crate::context::FunctionContext;
use crate::error::{EvalError, EvalResult};
use crate::operators::terms::lang_matches;
use crate::overloads::{OverloadBuilder, bool_term};
use crate::registry::{ArgumentType, Arity, FunctionRegistry};
use log::debug;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use sparql_expr_types::vocab::xsd;
use sparql_expr_types::{Literal, Term, TypeAlias, numeric_to_f64};
use std::collections::HashMap;
use std::fmt;

/// String literal with the language tag of `template`
fn same_kind(template: &Literal, value: impl Into<String>) -> Term {
    match &template.language {
        Some(language) => Term::from(Literal::lang_string(value, language.as_str())),
        None => Term::from(Literal::string(value)),
    }
}

fn text(literal: &Literal) -> String {
    literal.as_str().map(str::to_string).unwrap_or_else(|| literal.str())
}

fn check_compatible(a: &Literal, b: &Literal) -> EvalResult<()> {
    match (&a.language, &b.language) {
        (_, None) => Ok(()),
        (Some(left), Some(right)) if left == right => Ok(()),
        (left, right) => Err(EvalError::IncompatibleLanguageTags {
            left: left.clone().unwrap_or_default(),
            right: right.clone().unwrap_or_default(),
        }),
    }
}

fn stringly() -> ArgumentType {
    TypeAlias::Stringly.into()
}

/// Register a function of two compatible string arguments
fn on_string_pair<F>(name: &str, f: F) -> OverloadBuilder
where
    F: Fn(&Literal, &str, &str) -> Term + Send + Sync + 'static,
{
    OverloadBuilder::new(name, Arity::Exact(2)).on_binary(stringly(), stringly(), move |a, b, _| {
        check_compatible(a, b)?;
        Ok(f(a, &text(a), &text(b)))
    })
}

/// Characters of `value` from 1-based `start`, for `length` characters when given
///
/// Positions are rounded half up and compared as doubles so NaN and infinite bounds select
/// nothing or everything the way the XPath substring function does.
pub(crate) fn substring(value: &str, start: f64, length: Option<f64>) -> String {
    let round = |x: f64| (x + 0.5).floor();
    let first = round(start);
    let end = length.map(|l| first + round(l));
    value
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (*index + 1) as f64;
            position >= first && end.is_none_or(|end| position < end)
        })
        .map(|(_, c)| c)
        .collect()
}

/// Percent-encode everything except RFC 3986 unreserved characters
pub(crate) fn encode_for_uri(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(char::from(byte))
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Compile a pattern with SPARQL regex flags
fn compile_regex(pattern: &str, flags: &str) -> EvalResult<Regex> {
    let invalid = |message: String| EvalError::InvalidRegex {
        pattern: pattern.to_string(),
        message,
    };
    let mut literal = false;
    let mut builder_flags = (false, false, false, false);
    for flag in flags.chars() {
        match flag {
            'i' => builder_flags.0 = true,
            'm' => builder_flags.1 = true,
            's' => builder_flags.2 = true,
            'x' => builder_flags.3 = true,
            'q' => literal = true,
            other => return Err(invalid(format!("unknown flag '{}'", other))),
        }
    }
    let source = if literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    let (case_insensitive, multi_line, dot_all, extended) = builder_flags;
    RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .multi_line(multi_line)
        .dot_matches_new_line(dot_all)
        .ignore_whitespace(extended)
        .build()
        .map_err(|e| invalid(e.to_string()))
}

/// Compiled patterns keyed by pattern text and flags
#[derive(Default)]
pub struct RegexCache {
    entries: RwLock<HashMap<(String, String), Regex>>,
}

impl RegexCache {
    /// Entries kept before the cache is cleared
    pub const CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled regex for `pattern` and `flags`, compiling on first use
    pub fn get_or_compile(&self, pattern: &str, flags: &str) -> EvalResult<Regex> {
        let key = (pattern.to_string(), flags.to_string());
        if let Some(regex) = self.entries.read().get(&key) {
            return Ok(regex.clone());
        }
        let regex = compile_regex(pattern, flags)?;
        let mut entries = self.entries.write();
        if entries.len() >= Self::CAPACITY {
            debug!("regex cache full, clearing {} entries", entries.len());
            entries.clear();
        }
        entries.insert(key, regex.clone());
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexCache").field("entries", &self.len()).finish()
    }
}

/// Rewrite an XPath replacement string (`$1`, `\$`, `\\`) into regex crate syntax
pub(crate) fn convert_replacement(replacement: &str) -> String {
    let mut result = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => result.push_str("$$"),
                Some(other) => result.push(other),
                None => result.push('\\'),
            },
            '$' => {
                let mut group = String::new();
                while let Some(digit) = chars.peek().copied().filter(char::is_ascii_digit) {
                    group.push(digit);
                    chars.next();
                }
                if group.is_empty() {
                    result.push_str("$$");
                } else {
                    result.push_str(&format!("${{{}}}", group));
                }
            }
            other => result.push(other),
        }
    }
    result
}

fn regex_test(
    input: &Literal,
    pattern: &Literal,
    flags: Option<&Literal>,
    ctx: &FunctionContext<'_>,
) -> EvalResult<Term> {
    let flags = flags.map(Literal::str).unwrap_or_default();
    let regex = ctx.shared.regex_cache.get_or_compile(&pattern.str(), &flags)?;
    Ok(bool_term(regex.is_match(&text(input))))
}

fn regex_replace(
    input: &Literal,
    pattern: &Literal,
    replacement: &Literal,
    flags: Option<&Literal>,
    ctx: &FunctionContext<'_>,
) -> EvalResult<Term> {
    let flags = flags.map(Literal::str).unwrap_or_default();
    let regex = ctx.shared.regex_cache.get_or_compile(&pattern.str(), &flags)?;
    let replacement = if flags.contains('q') {
        replacement.str().replace('$', "$$")
    } else {
        convert_replacement(&replacement.str())
    };
    let haystack = text(input);
    let replaced = regex.replace_all(&haystack, replacement.as_str());
    Ok(same_kind(input, replaced))
}

fn register_substr(registry: &mut FunctionRegistry) {
    let position = |literal: &Literal| numeric_to_f64(&literal.value).unwrap_or(f64::NAN);
    registry.register_operator(
        OverloadBuilder::new("substr", Arity::Between(2, 3))
            .on_binary(stringly(), TypeAlias::Numeric, move |source, start, _| {
                Ok(same_kind(source, substring(&text(source), position(start), None)))
            })
            .on_ternary(
                [stringly(), TypeAlias::Numeric.into(), TypeAlias::Numeric.into()],
                move |source, start, length, _| {
                    let value = substring(&text(source), position(start), Some(position(length)));
                    Ok(same_kind(source, value))
                },
            )
            .build(),
    );
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_operator(
        OverloadBuilder::new("strlen", Arity::Exact(1))
            .on_unary(stringly(), |a, _| {
                let length = text(a).chars().count();
                Ok(Term::from(Literal::integer(i64::try_from(length).unwrap_or(i64::MAX))))
            })
            .build(),
    );
    register_substr(registry);
    registry.register_operator(
        OverloadBuilder::new("ucase", Arity::Exact(1))
            .on_unary(stringly(), |a, _| Ok(same_kind(a, text(a).to_uppercase())))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("lcase", Arity::Exact(1))
            .on_unary(stringly(), |a, _| Ok(same_kind(a, text(a).to_lowercase())))
            .build(),
    );

    registry.register_operator(on_string_pair("strstarts", |_, a, b| bool_term(a.starts_with(b))).build());
    registry.register_operator(on_string_pair("strends", |_, a, b| bool_term(a.ends_with(b))).build());
    registry.register_operator(on_string_pair("contains", |_, a, b| bool_term(a.contains(b))).build());
    registry.register_operator(
        on_string_pair("strbefore", |source, a, b| match a.find(b) {
            Some(index) => same_kind(source, &a[..index]),
            None => Term::from(Literal::string("")),
        })
        .build(),
    );
    registry.register_operator(
        on_string_pair("strafter", |source, a, b| match a.find(b) {
            Some(index) => same_kind(source, &a[index + b.len()..]),
            None => Term::from(Literal::string("")),
        })
        .build(),
    );

    registry.register_operator(
        OverloadBuilder::new("encode_for_uri", Arity::Exact(1))
            .on_unary(stringly(), |a, _| Ok(Term::from(Literal::string(encode_for_uri(&text(a))))))
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("langmatches", Arity::Exact(2))
            .on_binary(xsd::STRING, xsd::STRING, |tag, range, _| {
                Ok(bool_term(lang_matches(&tag.str(), &range.str())))
            })
            .build(),
    );

    registry.register_operator(
        OverloadBuilder::new("regex", Arity::Between(2, 3))
            .on_binary(stringly(), xsd::STRING, |a, pattern, ctx| regex_test(a, pattern, None, ctx))
            .on_ternary(
                [stringly(), xsd::STRING.into(), xsd::STRING.into()],
                |a, pattern, flags, ctx| regex_test(a, pattern, Some(flags), ctx),
            )
            .build(),
    );
    registry.register_operator(
        OverloadBuilder::new("replace", Arity::Between(3, 4))
            .on_ternary(
                [stringly(), xsd::STRING.into(), xsd::STRING.into()],
                |a, pattern, replacement, ctx| regex_replace(a, pattern, replacement, None, ctx),
            )
            .set(
                &[stringly(), xsd::STRING.into(), xsd::STRING.into(), xsd::STRING.into()],
                |args, ctx| {
                    let literal = |i: usize| crate::overloads::literal_arg("replace", args, i);
                    regex_replace(literal(0)?, literal(1)?, literal(2)?, Some(literal(3)?), ctx)
                },
            )
            .build(),
    );
}
