//! Date-window selection over weekly records.

use chrono::{DateTime, NaiveDate, Utc};
use mediamix_core::types::WeeklyRecord;
use mediamix_core::{MixError, MixResult};
use serde::{Deserialize, Serialize};

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> MixResult<Self> {
        if start > end {
            return Err(MixError::Validation(format!(
                "window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window bounds taken from instants; time-of-day is dropped.
    pub fn from_instants(start: DateTime<Utc>, end: DateTime<Utc>) -> MixResult<Self> {
        Self::new(start.date_naive(), end.date_naive())
    }

    /// January 1st through December 31st of `year`.
    pub fn year(year: i32) -> MixResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| MixError::Validation(format!("year {year} out of range")))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| MixError::Validation(format!("year {year} out of range")))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Key used to label aggregates built over this window.
    pub fn period_key(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

/// Records whose calendar day falls inside `window`, in input order.
pub fn filter_by_window<'a>(
    records: &'a [WeeklyRecord],
    window: &DateWindow,
) -> Vec<&'a WeeklyRecord> {
    records
        .iter()
        .filter(|record| window.contains(record.day()))
        .collect()
}
