//! Calendar sequencing for the annual calendar.
//!
//! Two lazy sequences drive the renderer's iteration order: every day of a
//! month ([`days_in_month`]) and every month of a year ([`months_in_year`]).
//! Both deal in the string identifiers the rest of the pipeline keys on
//! (`YYYY-MM-DD` dates, `YYYY-MM` months).

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Errors from malformed date identifiers.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Year-month identifier did not parse as `YYYY-MM`.
    #[error("malformed year-month identifier {0:?} (expected YYYY-MM)")]
    BadYearMonth(String),

    /// Year identifier did not parse as a 4-digit year.
    #[error("malformed year identifier {0:?} (expected YYYY)")]
    BadYear(String),

    /// Date identifier did not parse as `YYYY-MM-DD`.
    #[error("malformed date identifier {0:?} (expected YYYY-MM-DD)")]
    BadDate(String),
}

/// Parse a `YYYY-MM-DD` date identifier.
pub fn parse_date(date: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| CalendarError::BadDate(date.to_string()))
}

/// Parse a `YYYY-MM` month identifier into the first day of that month.
pub fn parse_year_month(year_month: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(&format!("{year_month}-01"), "%Y-%m-%d")
        .map_err(|_| CalendarError::BadYearMonth(year_month.to_string()))
}

/// Lazy iterator over the days of one month. See [`days_in_month`].
#[derive(Clone, Debug)]
pub struct DaysInMonth {
    next: Option<NaiveDate>,
    month: u32,
}

impl Iterator for DaysInMonth {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let current = self.next.filter(|d| d.month() == self.month)?;
        self.next = current.succ_opt();
        Some(current.format("%Y-%m-%d").to_string())
    }
}

/// All days of `year_month` (e.g. `"2015-07"`) in ascending order, each
/// formatted `YYYY-MM-DD`. Month length is calendar-correct, leap years
/// included.
pub fn days_in_month(year_month: &str) -> Result<DaysInMonth, CalendarError> {
    let first = parse_year_month(year_month)?;
    Ok(DaysInMonth {
        next: Some(first),
        month: first.month(),
    })
}

/// Lazy iterator over the months of one year. See [`months_in_year`].
#[derive(Clone, Debug)]
pub struct MonthsInYear {
    year: i32,
    next_month: u32,
}

impl Iterator for MonthsInYear {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next_month > 12 {
            return None;
        }
        let id = format!("{:04}-{:02}", self.year, self.next_month);
        self.next_month += 1;
        Some(id)
    }
}

/// Exactly twelve `YYYY-MM` identifiers for `year` (e.g. `"2015"`),
/// January through December.
pub fn months_in_year(year: &str) -> Result<MonthsInYear, CalendarError> {
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CalendarError::BadYear(year.to_string()));
    }
    let year: i32 = year
        .parse()
        .map_err(|_| CalendarError::BadYear(year.to_string()))?;
    Ok(MonthsInYear {
        year,
        next_month: 1,
    })
}
