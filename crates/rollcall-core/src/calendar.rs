//! Calendar-day policy and clocks.
//!
//! Attendance is keyed by calendar day, so "today" has to mean the same thing
//! on every device. The day is taken in one configured timezone (UTC unless
//! configured otherwise) instead of whatever locale the caller runs in.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// Format of a calendar day string.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Decides which calendar day an instant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPolicy {
    timezone: Tz,
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl CalendarPolicy {
    /// Creates a policy that splits days at midnight in `timezone`.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// The timezone days are split in.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The calendar day `now` falls on.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

/// Whether `s` is a real calendar day written as `YYYY-MM-DD`.
#[must_use]
pub fn is_valid_date_string(s: &str) -> bool {
    parse_date(s).is_some()
}

/// Parses a strict `YYYY-MM-DD` string.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !DATE_RE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Formats a calendar day as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_utc_policy_uses_utc_day() {
        let policy = CalendarPolicy::default();
        let late = Utc.with_ymd_and_hms(2025, 3, 9, 23, 30, 0).unwrap();
        assert_eq!(policy.today(late), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn test_timezone_moves_day_boundary() {
        let policy = CalendarPolicy::new(chrono_tz::Asia::Tokyo);
        // 23:30 UTC is 08:30 the next morning in Tokyo.
        let late = Utc.with_ymd_and_hms(2025, 3, 9, 23, 30, 0).unwrap();
        assert_eq!(policy.today(late), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

        let policy = CalendarPolicy::new(chrono_tz::America::Los_Angeles);
        let early = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap();
        assert_eq!(policy.today(early), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-01-15"),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert!(is_valid_date_string("2024-02-29"));

        assert!(!is_valid_date_string("2025-02-30"));
        assert!(!is_valid_date_string("2025-1-15"));
        assert!(!is_valid_date_string("15/01/2025"));
        assert!(!is_valid_date_string("2025-01-15T00:00:00Z"));
    }

    #[test]
    fn test_format_date_pads() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(format_date(date), "2025-01-05");
    }
}
