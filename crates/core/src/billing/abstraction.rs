//! Abstraction periods: recurring day/month windows resolved to real dates.
//!
//! A purpose may abstract water between, say, 1 October and 31 March every
//! year. Billing needs concrete dates, so the window is anchored to the years
//! of a reference period (a billing period or a charge period). Because the
//! right recurs annually, the instance one year earlier is always computed as
//! well; a reference period can overlap either.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::BillingError;
use super::period::DateRange;

/// Recurring annual abstraction window, not tied to a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAbstractionWindow")]
pub struct AbstractionWindow {
    start_day: u32,
    start_month: u32,
    end_day: u32,
    end_month: u32,
}

#[derive(Deserialize)]
struct RawAbstractionWindow {
    start_day: u32,
    start_month: u32,
    end_day: u32,
    end_month: u32,
}

impl TryFrom<RawAbstractionWindow> for AbstractionWindow {
    type Error = BillingError;

    fn try_from(raw: RawAbstractionWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start_day, raw.start_month, raw.end_day, raw.end_month)
    }
}

impl AbstractionWindow {
    /// Creates a window, validating each day/month pair against a leap year
    /// so 29 February is accepted.
    pub fn new(
        start_day: u32,
        start_month: u32,
        end_day: u32,
        end_month: u32,
    ) -> Result<Self, BillingError> {
        let valid = |day, month| NaiveDate::from_ymd_opt(2000, month, day).is_some();

        if !valid(start_day, start_month) || !valid(end_day, end_month) {
            return Err(BillingError::InvalidAbstractionWindow {
                start_day,
                start_month,
                end_day,
                end_month,
            });
        }

        Ok(Self {
            start_day,
            start_month,
            end_day,
            end_month,
        })
    }

    /// Start day of month.
    #[must_use]
    pub const fn start_day(&self) -> u32 {
        self.start_day
    }

    /// Start month (1-12).
    #[must_use]
    pub const fn start_month(&self) -> u32 {
        self.start_month
    }

    /// End day of month.
    #[must_use]
    pub const fn end_day(&self) -> u32 {
        self.end_day
    }

    /// End month (1-12).
    #[must_use]
    pub const fn end_month(&self) -> u32 {
        self.end_month
    }

    /// True when the window runs over 31 December into the next year.
    #[must_use]
    pub const fn wraps_year(&self) -> bool {
        self.end_month < self.start_month
            || (self.end_month == self.start_month && self.end_day < self.start_day)
    }
}

/// The part of an abstraction period that falls inside the reference period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillablePeriod {
    /// First billable day.
    pub start_date: NaiveDate,
    /// Last billable day.
    pub end_date: NaiveDate,
    /// Inclusive count of billable days.
    pub days: i64,
}

/// One concrete yearly instance of an abstraction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractionPeriod {
    /// Start of the instance.
    pub start_date: NaiveDate,
    /// End of the instance.
    pub end_date: NaiveDate,
    /// Whether the instance overlaps the reference period.
    pub consider: bool,
    /// Overlap with the reference period; `None` when there is none.
    pub billable: Option<BillablePeriod>,
}

impl AbstractionPeriod {
    /// The instance as a plain range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Billable days, zero when the instance does not overlap.
    #[must_use]
    pub fn billable_days(&self) -> i64 {
        self.billable.map_or(0, |billable| billable.days)
    }
}

/// Resolves abstraction windows against reference periods.
pub struct AbstractionPeriodCalculator;

impl AbstractionPeriodCalculator {
    /// Yearly instances that overlap the reference period, with billable
    /// fields populated. Instances outside the reference period are dropped.
    #[must_use]
    pub fn yearly_ranges(reference: &DateRange, window: &AbstractionWindow) -> Vec<AbstractionPeriod> {
        Self::flagged_ranges(reference, window)
            .into_iter()
            .filter(|period| period.consider)
            .collect()
    }

    /// Both yearly instances (previous year first), each flagged with
    /// `consider`. Billable fields are only set on flagged instances.
    #[must_use]
    pub fn flagged_ranges(reference: &DateRange, window: &AbstractionWindow) -> Vec<AbstractionPeriod> {
        Self::instances(reference, window)
            .into_iter()
            .map(|instance| Self::flag(reference, instance))
            .collect()
    }

    /// The anchored instance plus the same instance one year earlier.
    fn instances(reference: &DateRange, window: &AbstractionWindow) -> Vec<DateRange> {
        let end_year = reference.end_date.year();
        let start_year = if window.wraps_year() {
            end_year - 1
        } else {
            end_year
        };

        let (Some(start_date), Some(end_date)) = (
            anchor(start_year, window.start_month, window.start_day),
            anchor(end_year, window.end_month, window.end_day),
        ) else {
            return Vec::new();
        };

        let current = DateRange {
            start_date,
            end_date,
        };

        let previous = start_date
            .checked_sub_months(Months::new(12))
            .zip(end_date.checked_sub_months(Months::new(12)))
            .map(|(start_date, end_date)| DateRange {
                start_date,
                end_date,
            });

        previous.into_iter().chain(std::iter::once(current)).collect()
    }

    fn flag(reference: &DateRange, instance: DateRange) -> AbstractionPeriod {
        let billable = instance.intersection(reference).map(|overlap| BillablePeriod {
            start_date: overlap.start_date,
            end_date: overlap.end_date,
            days: overlap.days(),
        });

        AbstractionPeriod {
            start_date: instance.start_date,
            end_date: instance.end_date,
            consider: billable.is_some(),
            billable,
        }
    }
}

/// Builds a date, pulling 29 February back to the 28th in non-leap years.
fn anchor(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        NaiveDate::from_ymd_opt(year, month, 1)?
            .checked_add_months(Months::new(1))?
            .pred_opt()
            .filter(|last| last.day() < day)
    })
}
