//! Literal values - runtime representation of typed RDF literals
//!
//! A [`Literal`] pairs a [`LiteralValue`] payload with the datatype IRI it was declared
//! with, the lexical form it was received in (if any) and an optional language tag.
//! The payload is a closed union with one case per value space the engine computes
//! with; everything else is carried as [`LiteralValue::Other`].

use crate::temporal::{DateTimeValue, DateValue, DurationValue, TimeValue};
use crate::type_system::TypeAlias;
use crate::vocab::{rdf, xsd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by literal value operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The literal has no effective boolean value
    #[error("Cannot coerce term to EBV: {term}")]
    EbvCoercion { term: String },

    /// A lexical form was outside the value space of its datatype
    #[error(transparent)]
    Lexical(#[from] crate::lexical::LexicalError),
}

/// Typed payload of a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum LiteralValue {
    // === Numerics ===
    Integer(i128),
    Decimal(Decimal),
    Float(f64),
    Double(f64),

    Boolean(bool),

    // === Strings ===
    String(String),
    /// Language-tagged string; the tag lives on the literal
    LangString(String),

    // === Temporal ===
    Date(DateValue),
    Time(TimeValue),
    DateTime(DateTimeValue),
    Duration(DurationValue),
    DayTimeDuration(DurationValue),
    YearMonthDuration(DurationValue),

    /// Lexical form invalid for its datatype; the value is permanently absent
    NonLexical {
        /// Whether the declared datatype derives from a numeric or boolean type
        numeric_or_boolean: bool,
    },

    /// Datatype outside the engine's value spaces, kept as its lexical form
    Other,
}

/// A typed literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Literal {
    fn typed(value: LiteralValue, datatype: &str) -> Self {
        Self {
            value,
            datatype: datatype.to_string(),
            lexical: None,
            language: None,
        }
    }

    // === Constructors ===

    pub fn integer(value: impl Into<i128>) -> Self {
        Self::typed(LiteralValue::Integer(value.into()), xsd::INTEGER)
    }

    pub fn decimal(value: Decimal) -> Self {
        Self::typed(LiteralValue::Decimal(value), xsd::DECIMAL)
    }

    pub fn float(value: f64) -> Self {
        Self::typed(LiteralValue::Float(value), xsd::FLOAT)
    }

    pub fn double(value: f64) -> Self {
        Self::typed(LiteralValue::Double(value), xsd::DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(LiteralValue::Boolean(value), xsd::BOOLEAN)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(LiteralValue::String(value.into()), xsd::STRING)
    }

    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into().to_lowercase()),
            ..Self::typed(LiteralValue::LangString(value.into()), rdf::LANG_STRING)
        }
    }

    pub fn date(value: DateValue) -> Self {
        Self::typed(LiteralValue::Date(value), xsd::DATE)
    }

    pub fn time(value: TimeValue) -> Self {
        Self::typed(LiteralValue::Time(value), xsd::TIME)
    }

    pub fn date_time(value: DateTimeValue) -> Self {
        Self::typed(LiteralValue::DateTime(value), xsd::DATE_TIME)
    }

    pub fn duration(value: DurationValue) -> Self {
        Self::typed(LiteralValue::Duration(value), xsd::DURATION)
    }

    pub fn day_time_duration(value: DurationValue) -> Self {
        Self::typed(LiteralValue::DayTimeDuration(value), xsd::DAY_TIME_DURATION)
    }

    pub fn year_month_duration(value: DurationValue) -> Self {
        Self::typed(LiteralValue::YearMonthDuration(value), xsd::YEAR_MONTH_DURATION)
    }

    /// Literal whose lexical form is not valid for `datatype`
    pub fn non_lexical(
        lexical: impl Into<String>,
        datatype: impl Into<String>,
        language: Option<String>,
        numeric_or_boolean: bool,
    ) -> Self {
        Self {
            value: LiteralValue::NonLexical { numeric_or_boolean },
            datatype: datatype.into(),
            lexical: Some(lexical.into()),
            language,
        }
    }

    /// Literal of a datatype the engine does not compute with
    pub fn other(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: LiteralValue::Other,
            datatype: datatype.into(),
            lexical: Some(lexical.into()),
            language: None,
        }
    }

    /// Keep the declared datatype (e.g. a subtype of the value space)
    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = datatype.into();
        self
    }

    /// Keep the lexical form the literal was received in
    pub fn with_lexical(mut self, lexical: impl Into<String>) -> Self {
        self.lexical = Some(lexical.into());
        self
    }

    // === Properties ===

    /// Datatype used by overload resolution
    pub fn dispatch_type(&self) -> &str {
        match self.value {
            LiteralValue::NonLexical { .. } => TypeAlias::NonLexical.as_str(),
            _ => &self.datatype,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.value,
            LiteralValue::Integer(_)
                | LiteralValue::Decimal(_)
                | LiteralValue::Float(_)
                | LiteralValue::Double(_)
        )
    }

    pub fn is_non_lexical(&self) -> bool {
        matches!(self.value, LiteralValue::NonLexical { .. })
    }

    /// Plain string content of xsd:string and rdf:langString literals
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            LiteralValue::String(s) | LiteralValue::LangString(s) => Some(s),
            _ => None,
        }
    }

    /// Lexical form: the received form when present, otherwise the canonical one
    pub fn str(&self) -> String {
        match &self.lexical {
            Some(lexical) => lexical.clone(),
            None => self.canonical(),
        }
    }

    /// Canonical lexical form of the typed value
    pub fn canonical(&self) -> String {
        match &self.value {
            LiteralValue::Integer(i) => i.to_string(),
            LiteralValue::Decimal(d) => d.normalize().to_string(),
            LiteralValue::Float(f) => format_float(*f),
            LiteralValue::Double(d) => format_double(*d),
            LiteralValue::Boolean(b) => b.to_string(),
            LiteralValue::String(s) | LiteralValue::LangString(s) => s.clone(),
            LiteralValue::Date(d) => d.to_string(),
            LiteralValue::Time(t) => t.to_string(),
            LiteralValue::DateTime(dt) => dt.to_string(),
            LiteralValue::Duration(d) | LiteralValue::DayTimeDuration(d) => d.to_lexical("PT0S"),
            LiteralValue::YearMonthDuration(d) => d.to_lexical("P0M"),
            LiteralValue::NonLexical { .. } | LiteralValue::Other => {
                self.lexical.clone().unwrap_or_default()
            }
        }
    }

    /// Effective boolean value
    pub fn coerce_ebv(&self) -> Result<bool, ValueError> {
        match &self.value {
            LiteralValue::Boolean(b) => Ok(*b),
            LiteralValue::Integer(i) => Ok(*i != 0),
            LiteralValue::Decimal(d) => Ok(!d.is_zero()),
            LiteralValue::Float(f) | LiteralValue::Double(f) => Ok(*f != 0.0 && !f.is_nan()),
            LiteralValue::String(s) | LiteralValue::LangString(s) => Ok(!s.is_empty()),
            LiteralValue::NonLexical {
                numeric_or_boolean: true,
            } => Ok(false),
            _ => Err(ValueError::EbvCoercion {
                term: self.to_string(),
            }),
        }
    }
}

/// Identity: same datatype, language and lexical form
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.datatype == other.datatype
            && self.language == other.language
            && self.str() == other.str()
    }
}

fn format_special(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("NaN".to_string())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "INF" } else { "-INF" }.to_string())
    } else {
        None
    }
}

/// xsd:float rendering: shortest decimal form
pub fn format_float(value: f64) -> String {
    format_special(value).unwrap_or_else(|| value.to_string())
}

/// xsd:double rendering: mantissa with a decimal point and a signless exponent (`1.0E0`)
pub fn format_double(value: f64) -> String {
    if let Some(special) = format_special(value) {
        return special;
    }
    let exponential = format!("{:e}", value);
    let (mantissa, exponent) = exponential
        .split_once('e')
        .unwrap_or((exponential.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{}E{}", mantissa, exponent)
    } else {
        format!("{}.0E{}", mantissa, exponent)
    }
}

fn escape_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        escape_literal(f, &self.str())?;
        write!(f, "\"")?;
        match &self.language {
            Some(language) => write!(f, "@{}", language),
            None if self.datatype == xsd::STRING => Ok(()),
            None => write!(f, "^^<{}>", self.datatype),
        }
    }
}
