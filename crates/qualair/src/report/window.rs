//! Closed timestamp windows matched against `Mesure.date_debut`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};

/// Timestamp layout used by the measurement database.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A closed `[start, end]` range of measurement start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateWindow {
    /// Build a window.
    ///
    /// # Errors
    ///
    /// Returns an error if `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_date_window(format!(
                "start {} is after end {}",
                start.format(TIMESTAMP_FORMAT),
                end.format(TIMESTAMP_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole days `start_day..=end_day` of one month, from midnight to
    /// `23:59:59`. Days past the end of the month are clamped to its last day.
    ///
    /// # Errors
    ///
    /// Returns an error if the month does not exist, a day is zero, or
    /// `start_day` is after `end_day`.
    pub fn month_days(year: i32, month: u32, start_day: u32, end_day: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            Error::invalid_date_window(format!("no such month: {year}-{month:02}"))
        })?;
        if start_day == 0 || end_day == 0 {
            return Err(Error::invalid_date_window("days start at 1"));
        }

        let last_day = days_in_month(first);
        let day = |d: u32| first.with_day(d.min(last_day));

        let start = day(start_day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| Error::invalid_date_window(format!("invalid day {start_day}")))?;
        let end = day(end_day)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or_else(|| Error::invalid_date_window(format!("invalid day {end_day}")))?;

        Self::new(start, end)
    }

    /// Start bound formatted for SQL.
    #[must_use]
    pub fn start_param(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    /// End bound formatted for SQL.
    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.and_then(|n| n.pred_opt()).map_or(31, |d| d.day())
}
