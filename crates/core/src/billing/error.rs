//! Billing calculation error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the billing calculations.
///
/// The calculations are pure; these only fire on malformed input or on
/// data that breaks an invariant upstream validation should have enforced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    /// The charge version does not overlap the requested financial year.
    #[error(
        "Charge version {charge_version_start} to {} is outside financial year ending {financial_year_ending}",
        .charge_version_end.map_or_else(|| "open".to_string(), |d| d.to_string())
    )]
    OutOfPeriod {
        /// Start of the charge version.
        charge_version_start: NaiveDate,
        /// End of the charge version, if it has one.
        charge_version_end: Option<NaiveDate>,
        /// The financial year that was requested.
        financial_year_ending: i32,
    },

    /// Abstraction window day/month values do not form real calendar dates.
    #[error("Invalid abstraction window {start_day}/{start_month} to {end_day}/{end_month}")]
    InvalidAbstractionWindow {
        /// Start day of month.
        start_day: u32,
        /// Start month.
        start_month: u32,
        /// End day of month.
        end_day: u32,
        /// End month.
        end_month: u32,
    },

    /// Range start falls after its end.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Financial year ending cannot be represented as calendar dates.
    #[error("Invalid financial year ending {0}")]
    InvalidFinancialYear(i32),
}

impl BillingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfPeriod { .. } => "OUT_OF_PERIOD",
            Self::InvalidAbstractionWindow { .. } => "INVALID_ABSTRACTION_WINDOW",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InvalidFinancialYear(_) => "INVALID_FINANCIAL_YEAR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_period_display() {
        let err = BillingError::OutOfPeriod {
            charge_version_start: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            charge_version_end: None,
            financial_year_ending: 2023,
        };
        assert_eq!(
            err.to_string(),
            "Charge version 2024-04-01 to open is outside financial year ending 2023"
        );
        assert_eq!(err.error_code(), "OUT_OF_PERIOD");
    }

    #[test]
    fn test_invalid_window_display() {
        let err = BillingError::InvalidAbstractionWindow {
            start_day: 31,
            start_month: 4,
            end_day: 30,
            end_month: 9,
        };
        assert_eq!(err.to_string(), "Invalid abstraction window 31/4 to 30/9");
    }
}
