//! Bill run domain types.
//!
//! A bill run groups bills for one region and financial year. Each bill
//! belongs to a billing account; each bill licence links a bill to a licence
//! and owns the transactions charged against it.

use chrono::{DateTime, Utc};
use riverbill_shared::types::{BillId, BillLicenceId, BillRunId, BillingAccountId, LicenceId, RegionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::billing::TransactionLine;

/// Bill run status.
///
/// The send protocol moves a run `ready → sending → sent`. A run that fails
/// while sending stays in `sending` and the failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillRunStatus {
    /// Created and waiting to be processed.
    Queued,
    /// Bills are being generated.
    Processing,
    /// Generated and ready to be sent.
    Ready,
    /// Two-part tariff review in progress.
    Review,
    /// Approve and send requested from the Charging Module.
    Sending,
    /// Sent; invoice numbers assigned.
    Sent,
    /// Nothing to bill.
    Empty,
    /// Processing failed.
    Error,
    /// Being cancelled.
    Cancel,
}

impl BillRunStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Review => "review",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Empty => "empty",
            Self::Error => "error",
            Self::Cancel => "cancel",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready),
            "review" => Some(Self::Review),
            "sending" => Some(Self::Sending),
            "sent" => Some(Self::Sent),
            "empty" => Some(Self::Empty),
            "error" => Some(Self::Error),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    /// Only a ready run can be sent.
    #[must_use]
    pub fn can_send(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for BillRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of bill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    /// Bills every licence for the financial year.
    Annual,
    /// Bills licences changed since they were last billed.
    Supplementary,
    /// Bills the second part of two-part tariff charges.
    TwoPartTariff,
    /// Supplementary run for two-part tariff charges.
    TwoPartSupplementary,
}

impl BatchType {
    /// Returns the string representation of the batch type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Supplementary => "supplementary",
            Self::TwoPartTariff => "two_part_tariff",
            Self::TwoPartSupplementary => "two_part_supplementary",
        }
    }

    /// Parses a batch type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "annual" => Some(Self::Annual),
            "supplementary" => Some(Self::Supplementary),
            "two_part_tariff" => Some(Self::TwoPartTariff),
            "two_part_supplementary" => Some(Self::TwoPartSupplementary),
            _ => None,
        }
    }

    /// Supplementary runs clear the supplementary flag on billed licences
    /// once sent.
    #[must_use]
    pub fn is_supplementary(&self) -> bool {
        matches!(self, Self::Supplementary | Self::TwoPartSupplementary)
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a bill sits in a reissue chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebillingState {
    /// The bill has been reissued.
    Rebilled,
    /// Cancels the bill being reissued.
    Reversal,
    /// Replaces the bill being reissued.
    Rebill,
}

impl RebillingState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rebilled => "rebilled",
            Self::Reversal => "reversal",
            Self::Rebill => "rebill",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rebilled" => Some(Self::Rebilled),
            "reversal" => Some(Self::Reversal),
            "rebill" => Some(Self::Rebill),
            _ => None,
        }
    }
}

impl fmt::Display for RebillingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A batch of bills processed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillRun {
    /// Local id.
    pub id: BillRunId,
    /// Region the run bills.
    pub region_id: RegionId,
    /// Charging Module bill run id, set once the run exists there.
    pub external_id: Option<Uuid>,
    /// Number assigned by the Charging Module.
    pub bill_run_number: Option<i32>,
    /// Current status.
    pub status: BillRunStatus,
    /// Kind of run.
    pub batch_type: BatchType,
    /// First financial year billed, by its ending year.
    pub from_financial_year_ending: i32,
    /// Last financial year billed, by its ending year.
    pub to_financial_year_ending: i32,
    /// Transaction file name, known once sent.
    pub transaction_file_reference: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

/// A single customer's bill (invoice) within a bill run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Local id.
    pub id: BillId,
    /// Run the bill belongs to.
    pub bill_run_id: BillRunId,
    /// Account being billed.
    pub billing_account_id: BillingAccountId,
    /// Customer reference of the account.
    pub account_number: String,
    /// Charging Module invoice id.
    pub external_id: Option<Uuid>,
    /// Invoice number assigned by the Charging Module when the run is sent.
    pub invoice_number: Option<String>,
    /// Financial year billed, by its ending year.
    pub financial_year_ending: i32,
    /// Signed net amount in pence; credits are negative.
    pub net_amount: i64,
    /// True when the net amount is a credit.
    pub is_credit: bool,
    /// Queued for reissue in the next supplementary run.
    pub flagged_for_rebilling: bool,
    /// Role in a reissue chain, if any.
    pub rebilling_state: Option<RebillingState>,
    /// Root bill of the reissue chain this bill belongs to.
    pub original_bill_id: Option<BillId>,
}

/// Links a bill to a licence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLicence {
    /// Local id.
    pub id: BillLicenceId,
    /// Bill the licence appears on.
    pub bill_id: BillId,
    /// Licence being billed.
    pub licence_id: LicenceId,
    /// Licence reference, for example `01/123`.
    pub licence_ref: String,
}

/// A persisted transaction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Bill licence the transaction belongs to.
    pub bill_licence_id: BillLicenceId,
    /// Signed net amount in pence, known once the Charging Module has
    /// calculated the charge.
    pub net_amount: Option<i64>,
    /// The line this transaction records.
    #[serde(flatten)]
    pub line: TransactionLine,
}

/// A bill licence together with its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLicenceWithTransactions {
    /// The bill licence.
    pub bill_licence: BillLicence,
    /// Its transactions.
    pub transactions: Vec<Transaction>,
}

/// A bill together with its licences and their transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillWithLicences {
    /// The bill.
    pub bill: Bill,
    /// Its licences and their transactions.
    pub bill_licences: Vec<BillLicenceWithTransactions>,
}
