//! Temporal value records for xsd:date, xsd:time, xsd:dateTime and the duration family
//!
//! The records hold plain numeric fields. Their `Display` implementations produce the
//! canonical XSD lexical forms: zero-padded fields, `Z` for a zero offset, and the
//! `PnYnMnDTnHnMnS` duration grammar with a single leading sign.

use chrono::FixedOffset;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A timezone offset. Both fields carry the sign of the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeZone {
    pub hours: i8,
    pub minutes: i8,
}

impl TimeZone {
    pub const UTC: TimeZone = TimeZone { hours: 0, minutes: 0 };

    pub fn new(hours: i8, minutes: i8) -> Self {
        Self { hours, minutes }
    }

    /// Build from a signed number of minutes east of UTC
    pub fn from_minutes(total: i32) -> Self {
        Self {
            hours: (total / 60) as i8,
            minutes: (total % 60) as i8,
        }
    }

    pub fn total_minutes(&self) -> i32 {
        i32::from(self.hours) * 60 + i32::from(self.minutes)
    }

    /// Offset as a day-time duration, as returned by `TIMEZONE()`
    pub fn to_duration(&self) -> DurationValue {
        DurationValue {
            hours: i64::from(self.hours),
            minutes: i64::from(self.minutes),
            ..DurationValue::default()
        }
    }
}

impl From<FixedOffset> for TimeZone {
    fn from(offset: FixedOffset) -> Self {
        Self::from_minutes(offset.local_minus_utc() / 60)
    }
}

/// Renders `±hh:mm`; a zero offset (`+00:00` or `-00:00`) renders as `Z`.
impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours == 0 && self.minutes == 0 {
            return write!(f, "Z");
        }
        let sign = if self.hours < 0 || self.minutes < 0 { '-' } else { '+' };
        write!(
            f,
            "{}{:02}:{:02}",
            sign,
            self.hours.unsigned_abs(),
            self.minutes.unsigned_abs()
        )
    }
}

fn write_optional_zone(f: &mut fmt::Formatter<'_>, zone: &Option<TimeZone>) -> fmt::Result {
    match zone {
        Some(zone) => write!(f, "{}", zone),
        None => Ok(()),
    }
}

fn write_year(f: &mut fmt::Formatter<'_>, year: i64) -> fmt::Result {
    if year < 0 {
        write!(f, "-{:04}", year.unsigned_abs())
    } else {
        write!(f, "{:04}", year)
    }
}

fn write_seconds(f: &mut fmt::Formatter<'_>, seconds: Decimal) -> fmt::Result {
    if seconds < Decimal::TEN {
        write!(f, "0{}", seconds)
    } else {
        write!(f, "{}", seconds)
    }
}

/// xsd:date value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateValue {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub timezone: Option<TimeZone>,
}

impl DateValue {
    pub fn new(year: i64, month: u8, day: u8) -> Self {
        Self {
            year,
            month,
            day,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Midnight of this date, keeping the timezone
    pub fn to_date_time(&self) -> DateTimeValue {
        DateTimeValue {
            year: self.year,
            month: self.month,
            day: self.day,
            hours: 0,
            minutes: 0,
            seconds: Decimal::ZERO,
            timezone: self.timezone,
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_year(f, self.year)?;
        write!(f, "-{:02}-{:02}", self.month, self.day)?;
        write_optional_zone(f, &self.timezone)
    }
}

/// xsd:time value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeValue {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Decimal,
    pub timezone: Option<TimeZone>,
}

impl TimeValue {
    pub fn new(hours: u8, minutes: u8, seconds: Decimal) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            timezone: None,
        }
    }

    /// Anchor this time on the reference date used by XPath time arithmetic (1972-12-31)
    pub fn to_date_time(&self) -> DateTimeValue {
        DateTimeValue {
            year: 1972,
            month: 12,
            day: 31,
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
            timezone: self.timezone,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:", self.hours, self.minutes)?;
        write_seconds(f, self.seconds)?;
        write_optional_zone(f, &self.timezone)
    }
}

/// xsd:dateTime value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTimeValue {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Decimal,
    pub timezone: Option<TimeZone>,
}

impl DateTimeValue {
    pub fn new(year: i64, month: u8, day: u8, hours: u8, minutes: u8, seconds: Decimal) -> Self {
        Self {
            year,
            month,
            day,
            hours,
            minutes,
            seconds,
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn date(&self) -> DateValue {
        DateValue {
            year: self.year,
            month: self.month,
            day: self.day,
            timezone: self.timezone,
        }
    }

    pub fn time(&self) -> TimeValue {
        TimeValue {
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
            timezone: self.timezone,
        }
    }
}

impl From<chrono::DateTime<FixedOffset>> for DateTimeValue {
    fn from(value: chrono::DateTime<FixedOffset>) -> Self {
        use chrono::{Datelike, Timelike};
        let millis = value.timestamp_subsec_millis();
        Self {
            year: i64::from(value.year()),
            month: value.month() as u8,
            day: value.day() as u8,
            hours: value.hour() as u8,
            minutes: value.minute() as u8,
            seconds: (Decimal::from(value.second()) + Decimal::new(i64::from(millis), 3)).normalize(),
            timezone: Some(TimeZone::from(*value.offset())),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_year(f, self.year)?;
        write!(
            f,
            "-{:02}-{:02}T{:02}:{:02}:",
            self.month, self.day, self.hours, self.minutes
        )?;
        write_seconds(f, self.seconds)?;
        write_optional_zone(f, &self.timezone)
    }
}

/// Duration value covering xsd:duration and both of its restricted sub-forms
///
/// All non-zero components share one sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationValue {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: Decimal,
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Duration components are unbounded integers in XSD; these conversions return `None`
/// when a total no longer fits the native representation.
impl DurationValue {
    /// Year-month component expressed in months
    pub fn to_months(&self) -> Option<i64> {
        self.year.checked_mul(12)?.checked_add(self.month)
    }

    /// Day-time component expressed in seconds
    pub fn to_seconds(&self) -> Option<Decimal> {
        let whole = (i128::from(self.day) * 24 + i128::from(self.hours)) * 3600 + i128::from(self.minutes) * 60;
        Decimal::from_i128(whole)?.checked_add(self.seconds)
    }

    /// Normalized year-month duration from a month count
    pub fn from_months(months: i64) -> Self {
        Self {
            year: months / 12,
            month: months % 12,
            ..Self::default()
        }
    }

    /// Normalized day-time duration from a (possibly fractional) second count
    pub fn from_seconds(total: Decimal) -> Option<Self> {
        let whole = total.trunc().to_i128()?;
        let fraction = total - total.trunc();
        let seconds_per_day = i128::from(SECONDS_PER_DAY);
        Some(Self {
            day: i64::try_from(whole / seconds_per_day).ok()?,
            hours: ((whole % seconds_per_day) / 3600) as i64,
            minutes: ((whole % 3600) / 60) as i64,
            seconds: (Decimal::from_i128(whole % 60)? + fraction).normalize(),
            ..Self::default()
        })
    }

    pub fn year_month_part(&self) -> Option<Self> {
        Some(Self::from_months(self.to_months()?))
    }

    pub fn day_time_part(&self) -> Option<Self> {
        Self::from_seconds(self.to_seconds()?)
    }

    pub fn has_year_month(&self) -> bool {
        self.year != 0 || self.month != 0
    }

    pub fn has_day_time(&self) -> bool {
        self.day != 0 || self.hours != 0 || self.minutes != 0 || !self.seconds.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        !self.has_year_month() && !self.has_day_time()
    }

    pub fn is_negative(&self) -> bool {
        self.year < 0
            || self.month < 0
            || self.day < 0
            || self.hours < 0
            || self.minutes < 0
            || self.seconds.is_sign_negative() && !self.seconds.is_zero()
    }

    pub fn negate(&self) -> Self {
        Self {
            year: -self.year,
            month: -self.month,
            day: -self.day,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
        }
    }

    /// Lexical form, rendering an all-zero duration as `zero`
    ///
    /// xsd:duration and xsd:dayTimeDuration use `PT0S`, xsd:yearMonthDuration uses `P0M`.
    pub fn to_lexical(&self, zero: &str) -> String {
        if self.is_zero() {
            return zero.to_string();
        }
        let mut out = String::new();
        if self.is_negative() {
            out.push('-');
        }
        out.push('P');
        if self.year != 0 {
            out.push_str(&format!("{}Y", self.year.unsigned_abs()));
        }
        if self.month != 0 {
            out.push_str(&format!("{}M", self.month.unsigned_abs()));
        }
        if self.day != 0 {
            out.push_str(&format!("{}D", self.day.unsigned_abs()));
        }
        if self.hours != 0 || self.minutes != 0 || !self.seconds.is_zero() {
            out.push('T');
            if self.hours != 0 {
                out.push_str(&format!("{}H", self.hours.unsigned_abs()));
            }
            if self.minutes != 0 {
                out.push_str(&format!("{}M", self.minutes.unsigned_abs()));
            }
            if !self.seconds.is_zero() {
                out.push_str(&format!("{}S", self.seconds.abs()));
            }
        }
        out
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lexical("PT0S"))
    }
}
