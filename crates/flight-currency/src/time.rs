//! Calendar-day utilities.
//!
//! All engine dates are `chrono::NaiveDate`. There is no time of day and no
//! timezone; one evaluation date means one calendar day.

use chrono::{Days, NaiveDate};

use crate::error::{CurrencyError, Result};

/// Date format accepted on input and produced on output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` string.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| CurrencyError::InvalidDate(format!("'{s}': {e}")))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Add whole days to a date. `None` when the result leaves chrono's range.
pub fn add_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
}

/// Whole calendar days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Today's date in the local calendar.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
