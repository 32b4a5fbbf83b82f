//! Calendar-date helpers.
//!
//! All entity dates are plain calendar days (`time::Date`) exchanged as
//! `YYYY-MM-DD` strings. Because that form sorts lexically in date order, the
//! store can compare dates as text.

use core::fmt;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration};

use crate::error::{ParseError, ParseResult};

const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

#[cfg(feature = "serde")]
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` string.
///
/// Trailing time components (as produced by some spreadsheets and
/// JavaScript clients, e.g. `2025-01-15T00:00:00Z`) are ignored.
///
/// ```
/// use fueltrack_types::parse_date;
///
/// let date = parse_date("2025-01-15").unwrap();
/// assert_eq!(date.to_string(), "2025-01-15");
/// assert!(parse_date("15/01/2025").is_err());
/// ```
pub fn parse_date(value: &str) -> ParseResult<Date> {
    let trimmed = value.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(head, ISO_DATE).map_err(|_| ParseError::InvalidDate(value.to_string()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: Date, to: Date) -> i64 {
    (to - from).whole_days()
}

/// Add a number of days to a date, saturating at the calendar bounds.
pub fn add_days(date: Date, days: i64) -> Date {
    date.checked_add(Duration::days(days)).unwrap_or(if days < 0 {
        Date::MIN
    } else {
        Date::MAX
    })
}

/// A half-open span of calendar days: `(after, through]`.
///
/// The start day is excluded because it is already accounted for by the
/// snapshot taken on it; the end day is included because its consumption is
/// newly observed. Weather sums between two tank observations always use
/// this convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    /// Exclusive lower bound.
    pub after: Date,
    /// Inclusive upper bound.
    pub through: Date,
}

impl DateRange {
    /// Create a range covering the days after `after` up to and including `through`.
    pub fn new(after: Date, through: Date) -> Self {
        Self { after, through }
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: Date) -> bool {
        self.after < date && date <= self.through
    }

    /// Whether the range covers no days at all.
    pub fn is_empty(&self) -> bool {
        self.through <= self.after
    }

    /// Number of days covered (zero when empty).
    pub fn days(&self) -> i64 {
        days_between(self.after, self.through).max(0)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", format_date(self.after), format_date(self.through))
    }
}
