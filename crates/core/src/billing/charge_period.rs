//! Charge period resolution: a charge version intersected with a financial year.

use super::error::BillingError;
use super::period::{DateRange, FinancialYear};
use super::types::{ChargeVersion, LicenceDates};

/// Resolves charge periods.
pub struct ChargePeriodResolver;

impl ChargePeriodResolver {
    /// Intersects the charge version with the financial year ending in
    /// `financial_year_ending`.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::OutOfPeriod` when the charge version starts after
    /// the year ends or ends before the year starts.
    pub fn resolve(
        charge_version: &ChargeVersion,
        financial_year_ending: i32,
    ) -> Result<DateRange, BillingError> {
        let year = FinancialYear::from_year_ending(financial_year_ending)?;
        Self::check_overlap(charge_version, &year)?;

        let end_date = charge_version
            .end_date
            .map_or(year.end_date(), |end| end.min(year.end_date()));

        Ok(DateRange {
            start_date: charge_version.start_date.max(year.start_date()),
            end_date,
        })
    }

    /// As [`Self::resolve`], then narrowed by the licence lifecycle.
    ///
    /// The earliest expiry, lapse or revocation date inside the year caps the
    /// end. A licence start later than the charge version start moves the
    /// start forward. Returns `Ok(None)` when the licence leaves no chargeable
    /// days in the year: it ended before the year began, it starts after the
    /// year ends, or the narrowed range is empty.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::OutOfPeriod` under the same conditions as
    /// [`Self::resolve`].
    pub fn resolve_for_licence(
        charge_version: &ChargeVersion,
        licence: &LicenceDates,
        financial_year_ending: i32,
    ) -> Result<Option<DateRange>, BillingError> {
        let year = FinancialYear::from_year_ending(financial_year_ending)?;
        let mut period = Self::resolve(charge_version, financial_year_ending)?;

        if licence.end_dates().any(|end| end < year.start_date()) {
            return Ok(None);
        }
        if licence.start_date > year.end_date() {
            return Ok(None);
        }

        if let Some(earliest_end) = licence.end_dates().filter(|end| year.contains(*end)).min() {
            period.end_date = period.end_date.min(earliest_end);
        }
        if licence.start_date > charge_version.start_date && year.contains(licence.start_date) {
            period.start_date = period.start_date.max(licence.start_date);
        }

        if period.start_date > period.end_date {
            return Ok(None);
        }

        Ok(Some(period))
    }

    fn check_overlap(charge_version: &ChargeVersion, year: &FinancialYear) -> Result<(), BillingError> {
        let starts_after_year = charge_version.start_date > year.end_date();
        let ends_before_year = charge_version
            .end_date
            .is_some_and(|end| end < year.start_date());

        if starts_after_year || ends_before_year {
            return Err(BillingError::OutOfPeriod {
                charge_version_start: charge_version.start_date,
                charge_version_end: charge_version.end_date,
                financial_year_ending: year.year_ending(),
            });
        }
        Ok(())
    }
}
