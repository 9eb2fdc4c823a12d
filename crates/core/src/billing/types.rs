//! Charge version, charge element and licence inputs to the billing calculations.

use chrono::NaiveDate;
use riverbill_shared::types::{ChargeElementId, ChargeVersionId, LicenceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::abstraction::AbstractionWindow;

/// A purpose on a charge element. Each owns its own abstraction window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargePurpose {
    /// Purpose identifier.
    pub id: uuid::Uuid,
    /// Purpose description (e.g. "Spray Irrigation - Direct").
    pub description: String,
    /// Recurring abstraction window.
    pub abstraction_window: AbstractionWindow,
    /// Authorised annual quantity in megalitres.
    pub authorised_annual_quantity: Decimal,
    /// Loss category (high, medium, low, very low).
    pub loss: String,
}

/// Adjustment factors and agreements applied to a charge element.
///
/// Missing factors are treated as 1 and missing agreements as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustments {
    /// Aggregate factor.
    #[serde(default)]
    pub aggregate: Option<Decimal>,
    /// Charge adjustment factor.
    #[serde(default)]
    pub charge: Option<Decimal>,
    /// Section 126 factor.
    #[serde(default)]
    pub s126: Option<Decimal>,
    /// Section 127 (two-part tariff) agreement.
    #[serde(default)]
    pub s127: bool,
    /// Section 130 (Canal and River Trust) agreement.
    #[serde(default)]
    pub s130: bool,
    /// Winter-only discount.
    #[serde(default)]
    pub winter: bool,
}

/// Additional charges that sit on top of the standard charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalCharges {
    /// Name of the supported source, when one applies.
    #[serde(default)]
    pub supported_source_name: Option<String>,
    /// Whether the water supplies a public water company.
    #[serde(default)]
    pub is_supply_public_water: bool,
}

/// Charge category a charge element is banded into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeCategory {
    /// Category reference, e.g. "4.5.12".
    pub reference: String,
    /// Short description of the band.
    pub short_description: String,
}

/// A billable component of a charge version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeElement {
    /// Element identifier.
    pub id: ChargeElementId,
    /// Free-text description shown on the bill.
    pub description: String,
    /// Source (tidal or non-tidal).
    pub source: String,
    /// Loss category.
    pub loss: String,
    /// Authorised volume in megalitres.
    pub volume: Decimal,
    /// Charge category band.
    pub charge_category: ChargeCategory,
    /// Adjustment factors.
    #[serde(default)]
    pub adjustments: Adjustments,
    /// Additional charges, if any.
    #[serde(default)]
    pub additional_charges: Option<AdditionalCharges>,
    /// Purposes and their abstraction windows.
    pub purposes: Vec<ChargePurpose>,
}

/// A time-bounded charging agreement on a licence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeVersion {
    /// Charge version identifier.
    pub id: ChargeVersionId,
    /// Licence the charge version belongs to.
    pub licence_id: LicenceId,
    /// First day the charge version applies.
    pub start_date: NaiveDate,
    /// Last day the charge version applies; open-ended when `None`.
    pub end_date: Option<NaiveDate>,
    /// Elements charged under this version.
    pub charge_elements: Vec<ChargeElement>,
}

/// Licence lifecycle dates that can cut a charge period short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceDates {
    /// Licence start date.
    pub start_date: NaiveDate,
    /// Date the licence expired.
    pub expired_date: Option<NaiveDate>,
    /// Date the licence lapsed.
    pub lapsed_date: Option<NaiveDate>,
    /// Date the licence was revoked.
    pub revoked_date: Option<NaiveDate>,
}

impl LicenceDates {
    /// Expiry, lapse and revocation dates that are set.
    pub fn end_dates(&self) -> impl Iterator<Item = NaiveDate> {
        [self.expired_date, self.lapsed_date, self.revoked_date]
            .into_iter()
            .flatten()
    }
}
