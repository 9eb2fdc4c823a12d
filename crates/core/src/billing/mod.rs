//! Billing period and transaction generation arithmetic.
//!
//! The pipeline runs leaf-first:
//! - `charge_period` intersects a charge version with a financial year
//! - `abstraction` turns a recurring day/month window into concrete yearly ranges
//! - `consolidate` merges overlapping ranges so no day is counted twice
//! - `billable_days` sums authorised and billable days for a charge element
//! - `transaction_line` assembles the standard and compensation lines

pub mod abstraction;
pub mod billable_days;
pub mod charge_period;
pub mod consolidate;
pub mod error;
pub mod period;
pub mod transaction_line;
pub mod types;

#[cfg(test)]
mod consolidate_props;

pub use abstraction::{AbstractionPeriod, AbstractionPeriodCalculator, AbstractionWindow, BillablePeriod};
pub use billable_days::{BillableDays, BillableDaysAggregator};
pub use charge_period::ChargePeriodResolver;
pub use consolidate::consolidate;
pub use error::BillingError;
pub use period::{DateRange, FinancialYear};
pub use transaction_line::{
    BuildOptions, COMPENSATION_CHARGE_DESCRIPTION, ChargeType, TransactionLine,
    TransactionLineBuilder,
};
pub use types::{
    AdditionalCharges, Adjustments, ChargeCategory, ChargeElement, ChargePurpose, ChargeVersion,
    LicenceDates,
};
