//! Calendar dates as exchanged with the backend.
//!
//! Every date crossing the backend boundary is a plain `YYYY-MM-DD` string.
//! Timestamps are interpreted in UTC and truncated to the day before any
//! comparison takes place.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot parse {0:?} as a calendar date")]
pub struct DateError(pub String);

pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.with_timezone(&Utc).date_naive());
    }
    // Offset-less timestamps are taken to be UTC already.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|datetime| datetime.date())
        .map_err(|_| DateError(s.to_owned()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Today, in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Add calendar months, clamping the day to the end of a shorter target
/// month. Saturates at the largest representable date.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Number of whole calendar months elapsed between `from` and `to`.
///
/// This is the largest `n` such that `add_months(from, n) <= to`, so an
/// incomplete trailing month is not counted. The result is negative when
/// `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut months =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if months > 0 && add_months(from, months.unsigned_abs()) > to {
        months -= 1;
    } else if months < 0 && sub_months(from, months.unsigned_abs()) < to {
        months += 1;
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(
            parse_date("2024-01-15"),
            Ok(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(date(" 2024-01-15 "), date("2024-01-15"));
    }

    #[test]
    fn test_parse_timestamp_uses_utc_day() {
        // 23:30 at -02:00 is already the next day in UTC.
        assert_eq!(date("2024-01-15T23:30:00-02:00"), date("2024-01-16"));
        assert_eq!(date("2024-01-15T23:30:00Z"), date("2024-01-15"));
        assert_eq!(date("2024-01-15T08:00:00.123"), date("2024-01-15"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_date("15/01/2024"), Err(DateError("15/01/2024".into())));
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date("2024-07-05")), "2024-07-05");
    }

    #[test]
    fn test_add_months() {
        assert_eq!(add_months(date("2024-01-15"), 6), date("2024-07-15"));
        assert_eq!(add_months(date("2024-11-30"), 3), date("2025-02-28"));
        assert_eq!(add_months(date("2024-01-31"), 1), date("2024-02-29"));
        assert_eq!(add_months(date("2024-01-31"), 0), date("2024-01-31"));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date("2024-01-15"), date("2024-07-15")), 6);
        assert_eq!(months_between(date("2024-01-15"), date("2024-07-14")), 5);
        assert_eq!(months_between(date("2024-01-15"), date("2024-01-20")), 0);
        assert_eq!(months_between(date("2024-01-31"), date("2024-02-29")), 1);
        assert_eq!(months_between(date("2023-11-10"), date("2024-02-10")), 3);
        assert_eq!(months_between(date("2024-07-15"), date("2024-01-16")), -5);
        assert_eq!(months_between(date("2024-07-15"), date("2024-01-15")), -6);
    }
}
