//! Authorised and billable day totals for a charge element.

use serde::{Deserialize, Serialize};

use super::abstraction::AbstractionPeriodCalculator;
use super::consolidate::consolidate;
use super::period::DateRange;
use super::types::ChargeElement;

/// Day totals for one charge element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableDays {
    /// Days abstraction is authorised within the billing period.
    pub authorised_days: i64,
    /// Days abstraction is authorised within the charge period.
    pub billable_days: i64,
}

/// Combines the abstraction windows of every purpose on an element.
pub struct BillableDaysAggregator;

impl BillableDaysAggregator {
    /// Authorised days are counted against the billing period, billable days
    /// against the charge period. Purposes with overlapping windows are
    /// consolidated first so shared days count once.
    #[must_use]
    pub fn aggregate(
        charge_period: &DateRange,
        billing_period: &DateRange,
        charge_element: &ChargeElement,
    ) -> BillableDays {
        BillableDays {
            authorised_days: Self::days_within(billing_period, charge_element),
            billable_days: Self::days_within(charge_period, charge_element),
        }
    }

    fn days_within(reference: &DateRange, charge_element: &ChargeElement) -> i64 {
        let ranges: Vec<DateRange> = charge_element
            .purposes
            .iter()
            .flat_map(|purpose| {
                AbstractionPeriodCalculator::yearly_ranges(reference, &purpose.abstraction_window)
            })
            .map(|period| period.range())
            .collect();

        consolidate(&ranges)
            .iter()
            .filter_map(|range| range.intersection(reference))
            .map(|range| range.days())
            .sum()
    }
}
