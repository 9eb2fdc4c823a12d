//! Date ranges and financial years.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::BillingError;

/// An inclusive date range. Both `start_date` and `end_date` are billable days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub start_date: NaiveDate,
    /// Last day of the range.
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting one whose start falls after its end.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, BillingError> {
        if start_date > end_date {
            return Err(BillingError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Returns true if the date falls within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_date <= other.end_date && self.end_date >= other.start_date
    }

    /// Returns the days both ranges share, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start_date: self.start_date.max(other.start_date),
            end_date: self.end_date.min(other.end_date),
        })
    }

    /// Inclusive number of days in the range.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// A financial year: 1 April to 31 March, identified by the year it ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinancialYear {
    year_ending: i32,
    period: DateRange,
}

impl FinancialYear {
    /// Builds the financial year ending on 31 March of `year_ending`.
    pub fn from_year_ending(year_ending: i32) -> Result<Self, BillingError> {
        let start_date = NaiveDate::from_ymd_opt(year_ending - 1, 4, 1)
            .ok_or(BillingError::InvalidFinancialYear(year_ending))?;
        let end_date = NaiveDate::from_ymd_opt(year_ending, 3, 31)
            .ok_or(BillingError::InvalidFinancialYear(year_ending))?;

        Ok(Self {
            year_ending,
            period: DateRange {
                start_date,
                end_date,
            },
        })
    }

    /// The financial year a given date falls in.
    pub fn containing(date: NaiveDate) -> Result<Self, BillingError> {
        let year_ending = if date.month() >= 4 {
            date.year() + 1
        } else {
            date.year()
        };
        Self::from_year_ending(year_ending)
    }

    /// Calendar year the financial year ends in.
    #[must_use]
    pub const fn year_ending(&self) -> i32 {
        self.year_ending
    }

    /// 1 April of the first calendar year.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.period.start_date
    }

    /// 31 March of the ending year.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.period.end_date
    }

    /// The year as a billing period.
    #[must_use]
    pub const fn period(&self) -> DateRange {
        self.period
    }

    /// Returns true if the date falls within the financial year.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.period.contains(date)
    }
}
