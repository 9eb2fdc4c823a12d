//! Transaction line assembly from a charge element and its day counts.

use chrono::NaiveDate;
use riverbill_shared::types::{ChargeElementId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::billable_days::BillableDaysAggregator;
use super::charge_period::ChargePeriodResolver;
use super::error::BillingError;
use super::period::{DateRange, FinancialYear};
use super::types::{ChargeElement, ChargePurpose, ChargeVersion, LicenceDates};

/// Fixed description carried by every compensation line.
pub const COMPENSATION_CHARGE_DESCRIPTION: &str = "Compensation charge: calculated from the charge reference, activity description and regional environmental improvement charge; excludes any supported source additional charge and two-part tariff charges";

const SEASON_ALL_YEAR: &str = "all year";
const STATUS_CANDIDATE: &str = "candidate";
const SCHEME_SROC: &str = "sroc";

/// Kind of charge a line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    /// Charge for the water abstracted.
    Standard,
    /// Compensation charge paid alongside the standard charge.
    Compensation,
}

impl ChargeType {
    /// Stored form of the charge type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Compensation => "compensation",
        }
    }

    /// Parses the stored form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "compensation" => Some(Self::Compensation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChargeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flags that change which lines are produced and how.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Water undertakers are not charged compensation.
    pub is_water_undertaker: bool,
    /// Produce credit lines.
    pub is_credit: bool,
}

/// A financial transaction line ready to be sent to the Charging Module.
///
/// Lines are built fresh for every bill run. Only `external_id` is filled in
/// later, once the Charging Module has accepted the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    /// Local id of the line.
    pub id: TransactionId,
    /// Element the line charges for.
    pub charge_element_id: ChargeElementId,
    /// First day of the charge period.
    pub start_date: NaiveDate,
    /// Last day of the charge period.
    pub end_date: NaiveDate,
    /// Water source of the charge reference.
    pub source: String,
    /// Abstraction season; always all year.
    pub season: String,
    /// Loss category of the charge reference.
    pub loss: String,
    /// True for a credit line.
    pub is_credit: bool,
    /// Standard or compensation charge.
    pub charge_type: ChargeType,
    /// Volume authorised by the licence.
    pub authorised_quantity: Decimal,
    /// Volume actually billed.
    pub billable_quantity: Decimal,
    /// Days abstraction was allowed in the charge period.
    pub authorised_days: i64,
    /// Days abstraction was allowed within the licence's billable span.
    pub billable_days: i64,
    /// Line status; `candidate` until sent.
    pub status: String,
    /// Text printed on the invoice.
    pub description: String,
    /// Chargeable volume.
    pub volume: Decimal,
    /// Section 126 adjustment factor.
    pub section_126_factor: Decimal,
    /// A section 127 (two-part tariff) agreement applies.
    pub section_127_agreement: bool,
    /// A section 130 (Canal and River Trust) agreement applies.
    pub section_130_agreement: bool,
    /// Line is the second part of a two-part tariff charge.
    pub second_part_charge: bool,
    /// Charging scheme; always `sroc`.
    pub scheme: String,
    /// Aggregate adjustment factor.
    pub aggregate_factor: Decimal,
    /// Charge adjustment factor.
    pub adjustment_factor: Decimal,
    /// Charge category reference, for example `4.3.1`.
    pub charge_category_code: String,
    /// Description of the charge category.
    pub charge_category_description: String,
    /// Winter-only discount applies.
    pub is_winter_only: bool,
    /// Supported source additional charge applies.
    pub supported_source: bool,
    /// Name of the supported source, if any.
    pub supported_source_name: Option<String>,
    /// Public water supply charge applies.
    pub water_company_charge: bool,
    /// Licence holder is a water undertaker.
    pub water_undertaker: bool,
    /// Licence is new in this bill run.
    pub is_new_licence: bool,
    /// Snapshot of the element's purposes when the line was built.
    pub purposes: Vec<ChargePurpose>,
    /// Charging Module id, once the line has been accepted.
    pub external_id: Option<uuid::Uuid>,
}

/// Builds transaction lines.
pub struct TransactionLineBuilder;

impl TransactionLineBuilder {
    /// Lines for one charge element.
    ///
    /// Returns nothing when the element has no billable days in the charge
    /// period. Otherwise returns a standard line, followed by a compensation
    /// line unless the licensee is a water undertaker.
    #[must_use]
    pub fn build(
        charge_element: &ChargeElement,
        billing_period: &DateRange,
        charge_period: &DateRange,
        is_new_licence: bool,
        options: BuildOptions,
    ) -> Vec<TransactionLine> {
        let days = BillableDaysAggregator::aggregate(charge_period, billing_period, charge_element);
        if days.billable_days == 0 {
            return Vec::new();
        }

        let adjustments = &charge_element.adjustments;
        let additional = charge_element.additional_charges.as_ref();
        let supported_source_name = additional.and_then(|a| a.supported_source_name.clone());

        let standard = TransactionLine {
            id: TransactionId::new(),
            charge_element_id: charge_element.id,
            start_date: charge_period.start_date,
            end_date: charge_period.end_date,
            source: charge_element.source.clone(),
            season: SEASON_ALL_YEAR.to_string(),
            loss: charge_element.loss.clone(),
            is_credit: options.is_credit,
            charge_type: ChargeType::Standard,
            authorised_quantity: charge_element.volume,
            billable_quantity: charge_element.volume,
            authorised_days: days.authorised_days,
            billable_days: days.billable_days,
            status: STATUS_CANDIDATE.to_string(),
            description: format!("Water abstraction charge: {}", charge_element.description),
            volume: charge_element.volume,
            section_126_factor: adjustments.s126.unwrap_or(Decimal::ONE),
            section_127_agreement: adjustments.s127,
            section_130_agreement: adjustments.s130,
            second_part_charge: false,
            scheme: SCHEME_SROC.to_string(),
            aggregate_factor: adjustments.aggregate.unwrap_or(Decimal::ONE),
            adjustment_factor: adjustments.charge.unwrap_or(Decimal::ONE),
            charge_category_code: charge_element.charge_category.reference.clone(),
            charge_category_description: charge_element.charge_category.short_description.clone(),
            is_winter_only: adjustments.winter,
            supported_source: supported_source_name.is_some(),
            supported_source_name,
            water_company_charge: additional.is_some_and(|a| a.is_supply_public_water),
            water_undertaker: options.is_water_undertaker,
            is_new_licence,
            purposes: charge_element.purposes.clone(),
            external_id: None,
        };

        if options.is_water_undertaker {
            return vec![standard];
        }

        let compensation = TransactionLine {
            id: TransactionId::new(),
            charge_type: ChargeType::Compensation,
            description: COMPENSATION_CHARGE_DESCRIPTION.to_string(),
            ..standard.clone()
        };

        vec![standard, compensation]
    }

    /// Lines for every element of a charge version in one financial year.
    ///
    /// The charge period is narrowed by the licence lifecycle; a licence with
    /// no chargeable days in the year yields no lines.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::OutOfPeriod` when the charge version does not
    /// overlap the financial year.
    pub fn build_for_charge_version(
        charge_version: &ChargeVersion,
        licence: &LicenceDates,
        financial_year_ending: i32,
        is_new_licence: bool,
        options: BuildOptions,
    ) -> Result<Vec<TransactionLine>, BillingError> {
        let billing_period = FinancialYear::from_year_ending(financial_year_ending)?.period();

        let Some(charge_period) =
            ChargePeriodResolver::resolve_for_licence(charge_version, licence, financial_year_ending)?
        else {
            return Ok(Vec::new());
        };

        Ok(charge_version
            .charge_elements
            .iter()
            .flat_map(|element| {
                Self::build(element, &billing_period, &charge_period, is_new_licence, options)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use riverbill_shared::types::{ChargeVersionId, LicenceId};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::billing::abstraction::AbstractionWindow;
    use crate::billing::types::{AdditionalCharges, Adjustments, ChargeCategory};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn element() -> ChargeElement {
        ChargeElement {
            id: ChargeElementId::new(),
            description: "Trickle irrigation".to_string(),
            source: "non-tidal".to_string(),
            loss: "low".to_string(),
            volume: dec!(6.82),
            charge_category: ChargeCategory {
                reference: "4.4.5".to_string(),
                short_description: "Low loss, non-tidal, restricted water".to_string(),
            },
            adjustments: Adjustments::default(),
            additional_charges: None,
            purposes: vec![ChargePurpose {
                id: Uuid::new_v4(),
                description: "Trickle Irrigation - Direct".to_string(),
                abstraction_window: AbstractionWindow::new(1, 4, 30, 9).unwrap(),
                authorised_annual_quantity: dec!(6.82),
                loss: "low".to_string(),
            }],
        }
    }

    fn financial_year() -> DateRange {
        DateRange::new(date(2022, 4, 1), date(2023, 3, 31)).unwrap()
    }

    #[test]
    fn test_water_undertaker_gets_standard_line_only() {
        let options = BuildOptions {
            is_water_undertaker: true,
            is_credit: false,
        };
        let lines = TransactionLineBuilder::build(&element(), &financial_year(), &financial_year(), false, options);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].charge_type, ChargeType::Standard);
        assert_eq!(lines[0].description, "Water abstraction charge: Trickle irrigation");
        assert_eq!(lines[0].authorised_days, 183);
        assert_eq!(lines[0].billable_days, 183);
    }

    #[test]
    fn test_missing_factors_default_to_one() {
        let lines = TransactionLineBuilder::build(
            &element(),
            &financial_year(),
            &financial_year(),
            false,
            BuildOptions::default(),
        );
        let line = &lines[0];
        assert_eq!(line.section_126_factor, Decimal::ONE);
        assert_eq!(line.aggregate_factor, Decimal::ONE);
        assert_eq!(line.adjustment_factor, Decimal::ONE);
        assert!(!line.section_127_agreement);
        assert!(!line.section_130_agreement);
        assert!(!line.is_winter_only);
    }

    #[test]
    fn test_adjustments_and_additional_charges_flow_through() {
        let mut element = element();
        element.adjustments = Adjustments {
            aggregate: Some(dec!(0.5)),
            charge: Some(dec!(0.75)),
            s126: Some(dec!(0.9)),
            s127: true,
            s130: true,
            winter: true,
        };
        element.additional_charges = Some(AdditionalCharges {
            supported_source_name: Some("Earl Soham - Deben".to_string()),
            is_supply_public_water: true,
        });

        let lines = TransactionLineBuilder::build(&element, &financial_year(), &financial_year(), true, BuildOptions::default());
        let line = &lines[0];

        assert_eq!(line.aggregate_factor, dec!(0.5));
        assert_eq!(line.adjustment_factor, dec!(0.75));
        assert_eq!(line.section_126_factor, dec!(0.9));
        assert!(line.section_127_agreement && line.section_130_agreement && line.is_winter_only);
        assert!(line.supported_source);
        assert_eq!(line.supported_source_name.as_deref(), Some("Earl Soham - Deben"));
        assert!(line.water_company_charge);
        assert!(line.is_new_licence);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_credit_flag_comes_from_options(#[case] is_credit: bool) {
        let options = BuildOptions {
            is_water_undertaker: false,
            is_credit,
        };
        let lines = TransactionLineBuilder::build(&element(), &financial_year(), &financial_year(), false, options);
        assert!(lines.iter().all(|line| line.is_credit == is_credit));
    }

    #[test]
    fn test_purposes_snapshot_is_independent_of_element() {
        let mut element = element();
        let lines = TransactionLineBuilder::build(&element, &financial_year(), &financial_year(), false, BuildOptions::default());
        element.purposes.clear();
        assert_eq!(lines[0].purposes.len(), 1);
    }

    #[test]
    fn test_charge_type_parse() {
        assert_eq!(ChargeType::parse("standard"), Some(ChargeType::Standard));
        assert_eq!(ChargeType::parse("compensation"), Some(ChargeType::Compensation));
        assert_eq!(ChargeType::parse("minimum"), None);
        assert_eq!(ChargeType::Compensation.to_string(), "compensation");
    }

    #[test]
    fn test_build_for_charge_version_walks_elements() {
        let mut out_of_season = element();
        out_of_season.purposes[0].abstraction_window = AbstractionWindow::new(1, 11, 31, 12).unwrap();

        let charge_version = ChargeVersion {
            id: ChargeVersionId::new(),
            licence_id: LicenceId::new(),
            start_date: date(2022, 10, 1),
            end_date: None,
            charge_elements: vec![element(), out_of_season],
        };
        let licence = LicenceDates {
            start_date: date(2010, 1, 1),
            expired_date: None,
            lapsed_date: None,
            revoked_date: None,
        };

        let lines = TransactionLineBuilder::build_for_charge_version(
            &charge_version,
            &licence,
            2023,
            false,
            BuildOptions::default(),
        )
        .unwrap();

        // Both elements bill from October: the summer window has nothing left,
        // the winter window bills November and December.
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.billable_days == 61));
        assert!(lines.iter().all(|line| line.start_date == date(2022, 10, 1)));
    }

    #[test]
    fn test_build_for_charge_version_revoked_licence_is_empty() {
        let charge_version = ChargeVersion {
            id: ChargeVersionId::new(),
            licence_id: LicenceId::new(),
            start_date: date(2020, 4, 1),
            end_date: None,
            charge_elements: vec![element()],
        };
        let licence = LicenceDates {
            start_date: date(2010, 1, 1),
            expired_date: None,
            lapsed_date: None,
            revoked_date: Some(date(2021, 5, 1)),
        };

        let lines = TransactionLineBuilder::build_for_charge_version(
            &charge_version,
            &licence,
            2023,
            false,
            BuildOptions::default(),
        )
        .unwrap();
        assert!(lines.is_empty());
    }
}
