//! Monday arithmetic.
//!
//! All week boundaries are taken from the local calendar date in the
//! configured timezone, never from elapsed seconds, so DST shifts cannot move
//! an instant into a neighbouring week.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;

/// The Monday on or before `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The Monday strictly after `date`, even when `date` is itself a Monday.
pub fn next_monday_after(date: NaiveDate) -> NaiveDate {
    monday_of(date) + Duration::weeks(1)
}

pub fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Local calendar date of an instant in `tz`.
pub fn local_date<Z: TimeZone>(instant: &DateTime<Z>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Official ranking Monday for an instant: its local date floored to Monday.
pub fn official_monday<Z: TimeZone>(instant: &DateTime<Z>, tz: Tz) -> NaiveDate {
    monday_of(local_date(instant, tz))
}

/// First Monday on which points earned at `instant` count.
pub fn activation_monday<Z: TimeZone>(instant: &DateTime<Z>, tz: Tz) -> NaiveDate {
    next_monday_after(local_date(instant, tz))
}

/// Whole weeks from `from` to `to`, both Mondays.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().div_euclid(7)
}
