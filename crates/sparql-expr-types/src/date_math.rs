//! Date/duration arithmetic
//!
//! Implements the XPath algorithm for adding a duration to a dateTime and the
//! elapsed-duration computation between two dateTimes. Every carry step goes through
//! [`FloorDiv`], which splits a value into a floor quotient and a remainder inside a
//! `[low, high)` range.

use crate::temporal::{DateTimeValue, DurationValue, TimeZone};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Floor division of a value against the range `[low, high)`
///
/// Returns `(quotient, remainder)` with `remainder` in `[low, high)` and
/// `value == quotient * (high - low) + remainder`.
pub trait FloorDiv: Sized {
    fn floor_div(self, low: i64, high: i64) -> (i64, Self);
}

impl FloorDiv for i64 {
    fn floor_div(self, low: i64, high: i64) -> (i64, Self) {
        let span = high - low;
        let shifted = self - low;
        (shifted.div_euclid(span), shifted.rem_euclid(span) + low)
    }
}

impl FloorDiv for Decimal {
    fn floor_div(self, low: i64, high: i64) -> (i64, Self) {
        let span = Decimal::from(high - low);
        let shifted = self - Decimal::from(low);
        let quotient = (shifted / span).floor();
        let remainder = shifted - quotient * span + Decimal::from(low);
        (quotient.to_i64().unwrap_or_default(), remainder)
    }
}

pub fn is_leap_year(year: i64) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

/// Number of days in `month` of `year`; months outside 1..=12 wrap into adjacent years
pub fn max_day_in_month(year: i64, month: i64) -> u8 {
    let (carry, month) = month.floor_div(1, 13);
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap_year(year.saturating_add(carry)) => 29,
        _ => 28,
    }
}

const DAYS_PER_400_YEARS: i64 = 146_097;

/// Add a duration to a dateTime following the XPath carry rules
///
/// Months carry into years first; then seconds, minutes, hours and days carry upwards.
/// The day of month is finally pulled back into range by borrowing from or carrying
/// into adjacent months. Returns `None` when the year leaves the `i64` range.
pub fn add_duration_to_date_time(date: &DateTimeValue, duration: &DurationValue) -> Option<DateTimeValue> {
    let months = i64::from(date.month).checked_add(duration.to_months()?)?;
    let (year_carry, month) = months.floor_div(1, 13);
    let mut year = date.year.checked_add(year_carry)?;
    let mut month = month;

    // hours, minutes and seconds of the normalized duration stay below a day
    let clock = DurationValue::from_seconds(duration.to_seconds()?)?;
    let (carry, seconds) = (date.seconds + clock.seconds).floor_div(0, 60);
    let (carry, minutes) = (i64::from(date.minutes) + clock.minutes + carry).floor_div(0, 60);
    let (carry, hours) = (i64::from(date.hours) + clock.hours + carry).floor_div(0, 24);

    let clamped_day = i64::from(date.day).clamp(1, i64::from(max_day_in_month(year, month)));
    let mut day = clamped_day.checked_add(clock.day)?.checked_add(carry)?;

    // the calendar repeats every 400 years
    let cycles = (day - 1).div_euclid(DAYS_PER_400_YEARS);
    if cycles != 0 {
        year = year.checked_add(cycles.checked_mul(400)?)?;
        day -= cycles * DAYS_PER_400_YEARS;
    }

    loop {
        let carry = if day < 1 {
            day += i64::from(max_day_in_month(year, month - 1));
            -1
        } else if day > i64::from(max_day_in_month(year, month)) {
            day -= i64::from(max_day_in_month(year, month));
            1
        } else {
            break;
        };
        let (year_carry, next_month) = (month + carry).floor_div(1, 13);
        month = next_month;
        year = year.checked_add(year_carry)?;
    }

    Some(DateTimeValue {
        year,
        month: month as u8,
        day: day as u8,
        hours: hours as u8,
        minutes: minutes as u8,
        seconds,
        timezone: date.timezone,
    })
}

/// Days between 0000-03-01 based civil dates and 1970-01-01
fn days_from_civil(year: i64, month: u8, day: u8) -> i128 {
    let year = i128::from(year) - i128::from(month <= 2);
    let era = year.div_euclid(400);
    let year_of_era = year.rem_euclid(400);
    let month = i128::from(month);
    let day_of_year = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + i128::from(day) - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Seconds since the Unix epoch of a dateTime, reading a missing timezone as `default_timezone`
pub fn to_utc_seconds(date: &DateTimeValue, default_timezone: TimeZone) -> Option<Decimal> {
    let zone = date.timezone.unwrap_or(default_timezone);
    let days = days_from_civil(date.year, date.month, date.day);
    let local_seconds = days * 86_400
        + i128::from(date.hours) * 3600
        + i128::from(date.minutes) * 60
        - i128::from(zone.total_minutes()) * 60;
    Decimal::from_i128(local_seconds)?.checked_add(date.seconds)
}

/// Signed day-time duration `first - second`
///
/// Operands without a timezone are read in `default_timezone`. All components of the
/// result carry the same sign.
pub fn elapsed_duration(
    first: &DateTimeValue,
    second: &DateTimeValue,
    default_timezone: TimeZone,
) -> Option<DurationValue> {
    let first = to_utc_seconds(first, default_timezone)?;
    let second = to_utc_seconds(second, default_timezone)?;
    DurationValue::from_seconds(first.checked_sub(second)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::{parse_date_time, parse_duration};
    use pretty_assertions::assert_eq;

    fn add(date: &str, duration: &str) -> String {
        let date = parse_date_time(date).unwrap();
        let duration = parse_duration(duration).unwrap();
        add_duration_to_date_time(&date, &duration).unwrap().to_string()
    }

    #[test]
    fn test_floor_div() {
        assert_eq!(7i64.floor_div(0, 5), (1, 2));
        assert_eq!((-1i64).floor_div(0, 60), (-1, 59));
        assert_eq!(13i64.floor_div(1, 13), (1, 1));
        assert_eq!(0i64.floor_div(1, 13), (-1, 12));
        assert_eq!(Decimal::new(-5, 1).floor_div(0, 60), (-1, Decimal::new(595, 1)));
    }

    #[test]
    fn test_max_day_in_month() {
        assert_eq!(max_day_in_month(2024, 2), 29);
        assert_eq!(max_day_in_month(1900, 2), 28);
        assert_eq!(max_day_in_month(2000, 2), 29);
        assert_eq!(max_day_in_month(2023, 0), 31);
        assert_eq!(max_day_in_month(2023, 14), 29);
        assert_eq!(max_day_in_month(-4, 2), 29);
    }

    #[test]
    fn test_add_month_clamps_day() {
        assert_eq!(add("2024-01-31T00:00:00Z", "P1M"), "2024-02-29T00:00:00Z");
        assert_eq!(add("2023-01-31T00:00:00Z", "P1M"), "2023-02-28T00:00:00Z");
    }

    #[test]
    fn test_add_carries_through_year() {
        assert_eq!(add("2023-12-31T23:59:59Z", "PT1S"), "2024-01-01T00:00:00Z");
        assert_eq!(add("2024-03-01T00:00:00", "-P1D"), "2024-02-29T00:00:00");
        assert_eq!(add("2000-01-12T12:13:14Z", "P1Y3M5DT7H10M3.3S"), "2001-04-17T19:23:17.3Z");
    }

    #[test]
    fn test_add_many_days() {
        assert_eq!(add("2024-01-01T00:00:00Z", "P366D"), "2025-01-01T00:00:00Z");
        assert_eq!(add("2024-01-01T00:00:00Z", "-P400D"), "2022-11-27T00:00:00Z");
    }

    #[test]
    fn test_add_whole_calendar_cycles() {
        assert_eq!(add("2024-02-29T00:00:00Z", "P146097D"), "2424-02-29T00:00:00Z");
        assert_eq!(add("2024-03-01T06:00:00Z", "-P292194DT7H"), "1224-02-29T23:00:00Z");
        assert_eq!(add("2000-01-01T00:00:00Z", "P999999999999999D"), "2737907008988-07-03T00:00:00Z");
    }

    #[test]
    fn test_add_out_of_range() {
        let date = parse_date_time("2000-01-01T00:00:00Z").unwrap();
        let years = parse_duration(&format!("P{}Y", i64::MAX / 2)).unwrap();
        assert_eq!(add_duration_to_date_time(&date, &years), None);

        let late = DateTimeValue::new(i64::MAX, 12, 31, 0, 0, Decimal::ZERO);
        let one_day = parse_duration("P1D").unwrap();
        assert_eq!(add_duration_to_date_time(&late, &one_day), None);
    }

    #[test]
    fn test_elapsed_duration() {
        let first = parse_date_time("2024-01-02T01:00:00Z").unwrap();
        let second = parse_date_time("2024-01-01T00:00:00Z").unwrap();
        let elapsed = elapsed_duration(&first, &second, TimeZone::UTC).unwrap();
        assert_eq!(elapsed.to_string(), "P1DT1H");
        assert_eq!(elapsed_duration(&second, &first, TimeZone::UTC).unwrap().to_string(), "-P1DT1H");
    }

    #[test]
    fn test_elapsed_duration_uses_default_timezone() {
        let zoned = parse_date_time("2024-01-01T12:00:00+02:00").unwrap();
        let local = parse_date_time("2024-01-01T12:00:00").unwrap();
        let elapsed = elapsed_duration(&local, &zoned, TimeZone::new(2, 0)).unwrap();
        assert!(elapsed.is_zero());
        let elapsed = elapsed_duration(&local, &zoned, TimeZone::UTC).unwrap();
        assert_eq!(elapsed.to_string(), "PT2H");
    }

    #[test]
    fn test_utc_seconds_epoch() {
        let epoch = parse_date_time("1970-01-01T00:00:00Z").unwrap();
        assert_eq!(to_utc_seconds(&epoch, TimeZone::UTC), Some(Decimal::ZERO));
        let next = parse_date_time("1970-01-02T01:00:00+01:00").unwrap();
        assert_eq!(to_utc_seconds(&next, TimeZone::UTC), Some(Decimal::from(86_400)));
    }
}
