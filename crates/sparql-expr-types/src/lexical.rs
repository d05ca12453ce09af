//! XSD lexical parsers
//!
//! Numeric parsers return `None` when the input is not in the lexical space of the
//! datatype. Date, time and duration parsers match a fixed grammar and report a
//! [`LexicalError`] naming the datatype that was expected.

use crate::date_math::{add_duration_to_date_time, max_day_in_month};
use crate::temporal::{DateTimeValue, DateValue, DurationValue, TimeValue, TimeZone};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// A string that is not a valid lexical form for the named datatype
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid lexical form '{value}' for {kind}")]
pub struct LexicalError {
    pub value: String,
    pub kind: &'static str,
}

impl LexicalError {
    pub fn new(value: impl Into<String>, kind: &'static str) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

pub type LexicalResult<T> = Result<T, LexicalError>;

// ============================================================================
// Numerics
// ============================================================================

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn strip_sign(s: &str) -> (bool, &str) {
    match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    }
}

/// Length of the `(\d+(\.\d*)?|\.\d+)` prefix of `s`, if it has one
fn decimal_prefix(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let int_digits = count_digits(bytes);
    let mut pos = int_digits;
    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        frac_digits = count_digits(&bytes[pos + 1..]);
        pos += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    Some(pos)
}

/// Parse an xsd:integer lexical form (`[+-]?[0-9]+`)
pub fn parse_integer(s: &str) -> Option<i128> {
    let (_, unsigned) = strip_sign(s);
    if unsigned.is_empty() || count_digits(unsigned.as_bytes()) != unsigned.len() {
        return None;
    }
    s.strip_prefix('+').unwrap_or(s).parse().ok()
}

/// Parse an xsd:decimal lexical form (`[+-]?(\d+(\.\d*)?|\.\d+)`)
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let (negative, unsigned) = strip_sign(s);
    if decimal_prefix(unsigned)? != unsigned.len() {
        return None;
    }
    let mut normalized = String::with_capacity(unsigned.len() + 2);
    if negative {
        normalized.push('-');
    }
    if unsigned.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(unsigned.strip_suffix('.').unwrap_or(unsigned));
    Decimal::from_str(&normalized).ok()
}

/// Parse an xsd:float / xsd:double lexical form, including `NaN`, `INF`, `+INF` and `-INF`
pub fn parse_float(s: &str) -> Option<f64> {
    match s {
        "NaN" => return Some(f64::NAN),
        "INF" | "+INF" => return Some(f64::INFINITY),
        "-INF" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let (_, unsigned) = strip_sign(s);
    let mantissa = decimal_prefix(unsigned)?;
    let rest = &unsigned[mantissa..];
    if !rest.is_empty() {
        let exponent = rest.strip_prefix(['e', 'E'])?;
        let (_, exponent_digits) = strip_sign(exponent);
        if exponent_digits.is_empty()
            || count_digits(exponent_digits.as_bytes()) != exponent_digits.len()
        {
            return None;
        }
    }
    f64::from_str(s).ok()
}

/// Parse an xsd:boolean lexical form (`true`, `false`, `1`, `0`)
pub fn parse_boolean(s: &str) -> Option<bool> {
    match s {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Dates and times
// ============================================================================

/// Byte cursor over a fixed-grammar lexical form
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    /// Consume a run of digits, returning the slice
    fn digits(&mut self) -> &'a [u8] {
        let n = count_digits(&self.bytes[self.pos..]);
        let run = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        run
    }

    /// Consume exactly `n` digits
    fn fixed(&mut self, n: usize) -> Option<u32> {
        let run = self.bytes.get(self.pos..self.pos + n)?;
        if !run.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.pos += n;
        Some(run.iter().fold(0, |acc, b| acc * 10 + u32::from(b - b'0')))
    }
}

fn digits_to_i64(run: &[u8]) -> Option<i64> {
    std::str::from_utf8(run).ok()?.parse().ok()
}

/// `-?([1-9][0-9]*)?[0-9]{4}-MM-DD`, without timezone
fn parse_date_fields(cursor: &mut Cursor<'_>) -> Option<(i64, u8, u8)> {
    let negative = cursor.eat(b'-');
    let year_digits = cursor.digits();
    if year_digits.len() < 4 || (year_digits.len() > 4 && year_digits[0] == b'0') {
        return None;
    }
    let year = digits_to_i64(year_digits)?;
    let year = if negative { -year } else { year };
    if !cursor.eat(b'-') {
        return None;
    }
    let month = cursor.fixed(2)? as u8;
    if !cursor.eat(b'-') {
        return None;
    }
    let day = cursor.fixed(2)? as u8;
    if !(1..=12).contains(&month) || day < 1 || day > max_day_in_month(year, i64::from(month)) {
        return None;
    }
    Some((year, month, day))
}

/// `HH:MM:SS(.s+)?`, allowing `24:00:00`
fn parse_time_fields(cursor: &mut Cursor<'_>) -> Option<(u8, u8, Decimal)> {
    let hours = cursor.fixed(2)? as u8;
    if !cursor.eat(b':') {
        return None;
    }
    let minutes = cursor.fixed(2)? as u8;
    if !cursor.eat(b':') {
        return None;
    }
    let start = cursor.pos;
    cursor.fixed(2)?;
    if cursor.eat(b'.') && cursor.digits().is_empty() {
        return None;
    }
    let text = std::str::from_utf8(&cursor.bytes[start..cursor.pos]).ok()?;
    let seconds = Decimal::from_str(text).ok()?;
    if minutes >= 60 || seconds >= Decimal::from(60) || hours > 24 {
        return None;
    }
    if hours == 24 && (minutes != 0 || !seconds.is_zero()) {
        return None;
    }
    Some((hours, minutes, seconds))
}

/// Optional `Z` or `[+-]HH:MM` suffix
fn parse_timezone(cursor: &mut Cursor<'_>) -> Option<Option<TimeZone>> {
    match cursor.peek() {
        None => Some(None),
        Some(b'Z') => {
            cursor.pos += 1;
            Some(Some(TimeZone::UTC))
        }
        Some(sign @ (b'+' | b'-')) => {
            cursor.pos += 1;
            let hours = cursor.fixed(2)? as i8;
            if !cursor.eat(b':') {
                return None;
            }
            let minutes = cursor.fixed(2)? as i8;
            if minutes >= 60 || hours > 14 || (hours == 14 && minutes != 0) {
                return None;
            }
            let factor = if sign == b'-' { -1 } else { 1 };
            Some(Some(TimeZone::new(factor * hours, factor * minutes)))
        }
        Some(_) => None,
    }
}

/// Parse a standalone timezone (`Z` or `[+-]HH:MM`)
pub fn parse_time_zone(s: &str) -> LexicalResult<TimeZone> {
    let mut cursor = Cursor::new(s);
    match parse_timezone(&mut cursor) {
        Some(Some(zone)) if cursor.at_end() => Ok(zone),
        _ => Err(LexicalError::new(s, "timezone")),
    }
}

/// Parse an xsd:date lexical form
pub fn parse_date(s: &str) -> LexicalResult<DateValue> {
    let error = || LexicalError::new(s, "date");
    let mut cursor = Cursor::new(s);
    let (year, month, day) = parse_date_fields(&mut cursor).ok_or_else(error)?;
    let timezone = parse_timezone(&mut cursor).ok_or_else(error)?;
    if !cursor.at_end() {
        return Err(error());
    }
    Ok(DateValue {
        year,
        month,
        day,
        timezone,
    })
}

/// Parse an xsd:time lexical form; `24:00:00` becomes `00:00:00`
pub fn parse_time(s: &str) -> LexicalResult<TimeValue> {
    let error = || LexicalError::new(s, "time");
    let mut cursor = Cursor::new(s);
    let (hours, minutes, seconds) = parse_time_fields(&mut cursor).ok_or_else(error)?;
    let timezone = parse_timezone(&mut cursor).ok_or_else(error)?;
    if !cursor.at_end() {
        return Err(error());
    }
    Ok(TimeValue {
        hours: hours % 24,
        minutes,
        seconds,
        timezone,
    })
}

/// Parse an xsd:dateTime lexical form; `T24:00:00` rolls over to the next day
pub fn parse_date_time(s: &str) -> LexicalResult<DateTimeValue> {
    let error = || LexicalError::new(s, "dateTime");
    let mut cursor = Cursor::new(s);
    let (year, month, day) = parse_date_fields(&mut cursor).ok_or_else(error)?;
    if !cursor.eat(b'T') {
        return Err(error());
    }
    let (hours, minutes, seconds) = parse_time_fields(&mut cursor).ok_or_else(error)?;
    let timezone = parse_timezone(&mut cursor).ok_or_else(error)?;
    if !cursor.at_end() {
        return Err(error());
    }
    let value = DateTimeValue {
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        timezone,
    };
    if hours == 24 {
        let one_day = DurationValue {
            day: 1,
            ..DurationValue::default()
        };
        let mut midnight = value.clone();
        midnight.hours = 0;
        return add_duration_to_date_time(&midnight, &one_day).ok_or_else(error);
    }
    Ok(value)
}

// ============================================================================
// Durations
// ============================================================================

/// Parse an xsd:duration lexical form (`-?PnYnMnDTnHnMnS`)
///
/// At least one component must be present, and a `T` must be followed by at least
/// one time component. The leading sign applies to every component.
pub fn parse_duration(s: &str) -> LexicalResult<DurationValue> {
    parse_duration_components(s).ok_or_else(|| LexicalError::new(s, "duration"))
}

fn parse_duration_components(s: &str) -> Option<DurationValue> {
    let mut cursor = Cursor::new(s);
    let negative = cursor.eat(b'-');
    if !cursor.eat(b'P') {
        return None;
    }

    let mut duration = DurationValue::default();
    let mut seen_any = false;

    // Date designators, in order
    let mut date_designators: &[u8] = b"YMD";
    while cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
        let value = digits_to_i64(cursor.digits())?;
        let designator = cursor.peek()?;
        let index = date_designators.iter().position(|d| *d == designator)?;
        cursor.pos += 1;
        match designator {
            b'Y' => duration.year = value,
            b'M' => duration.month = value,
            _ => duration.day = value,
        }
        date_designators = &date_designators[index + 1..];
        seen_any = true;
    }

    if cursor.eat(b'T') {
        let mut time_designators: &[u8] = b"HMS";
        let mut seen_time = false;
        while cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
            let start = cursor.pos;
            cursor.digits();
            let fractional = cursor.eat(b'.');
            if fractional && cursor.digits().is_empty() {
                return None;
            }
            let text = std::str::from_utf8(&cursor.bytes[start..cursor.pos]).ok()?;
            let designator = cursor.peek()?;
            let index = time_designators.iter().position(|d| *d == designator)?;
            cursor.pos += 1;
            match designator {
                b'H' if !fractional => duration.hours = text.parse().ok()?,
                b'M' if !fractional => duration.minutes = text.parse().ok()?,
                b'S' => duration.seconds = Decimal::from_str(text).ok()?,
                _ => return None,
            }
            time_designators = &time_designators[index + 1..];
            seen_time = true;
        }
        if !seen_time {
            return None;
        }
        seen_any = true;
    }

    if !seen_any || !cursor.at_end() {
        return None;
    }
    Some(if negative { duration.negate() } else { duration })
}

/// Parse an xsd:dayTimeDuration; year or month components are rejected
pub fn parse_day_time_duration(s: &str) -> LexicalResult<DurationValue> {
    let duration = parse_duration(s)?;
    if duration.has_year_month() {
        return Err(LexicalError::new(s, "dayTimeDuration"));
    }
    Ok(duration)
}

/// Parse an xsd:yearMonthDuration; day or time components are rejected
pub fn parse_year_month_duration(s: &str) -> LexicalResult<DurationValue> {
    let duration = parse_duration(s)?;
    if duration.has_day_time() {
        return Err(LexicalError::new(s, "yearMonthDuration"));
    }
    Ok(duration)
}
