//! Charging Module request and response payloads.

use riverbill_core::bill_run::{ExternalInvoice, ExternalTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ruleset every bill run is created under.
pub const SROC_RULESET: &str = "sroc";

/// Body of a create bill run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBillRunRequest {
    /// Region code, for example `A`.
    pub region: String,
    /// Charging ruleset.
    pub ruleset: String,
}

/// Response to a create bill run request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRunResponse {
    /// The bill run created.
    pub bill_run: CreatedBillRun,
}

/// Bill run returned by a create request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBillRun {
    /// Charging Module bill run id.
    pub id: Uuid,
    /// Number shown to users.
    pub bill_run_number: i32,
}

/// Customer details sent when a billing account's address changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerChange {
    /// Region code.
    pub region: String,
    /// Billing account number.
    pub customer_reference: String,
    /// Company name.
    pub customer_name: String,
    /// First address line.
    pub address_line1: String,
    /// Second address line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    /// Third address line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line3: Option<String>,
    /// Fourth address line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line4: Option<String>,
    /// Town or city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line5: Option<String>,
    /// County.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line6: Option<String>,
    /// Postcode.
    pub postcode: String,
}

/// Response to a view bill run status request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BillRunStatusResponse {
    /// Charging Module status, for example `pending`.
    pub status: String,
}

/// Response to a view bill run request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBillRunResponse {
    /// The bill run.
    pub bill_run: ViewedBillRun,
}

/// Bill run returned by a view request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedBillRun {
    /// Charging Module bill run id.
    pub id: Uuid,
    /// Charging Module status.
    pub status: String,
    /// Transaction file name, once sent.
    #[serde(default)]
    pub transaction_file_reference: Option<String>,
    /// Invoices in the bill run.
    #[serde(default)]
    pub invoices: Vec<BillRunInvoice>,
}

/// Invoice summary within a viewed bill run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRunInvoice {
    /// Charging Module invoice id.
    pub id: Uuid,
    /// Invoice number, assigned once the bill run is sent.
    #[serde(default)]
    pub transaction_reference: Option<String>,
}

/// Response to a reissue (rebill) request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReissueResponse {
    /// Invoices created by the reissue.
    pub invoices: Vec<ReissuedInvoiceSummary>,
}

/// Invoice created by a reissue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissuedInvoiceSummary {
    /// Charging Module invoice id.
    pub id: Uuid,
    /// `C` for the cancelling invoice, `R` for the replacement.
    pub rebilled_type: String,
}

/// Response to a view bill (invoice) request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewInvoiceResponse {
    /// The invoice.
    pub invoice: ViewedInvoice,
}

/// Invoice returned by a view request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedInvoice {
    /// Charging Module invoice id.
    pub id: Uuid,
    /// Total of credit lines in pence.
    #[serde(default)]
    pub credit_line_value: i64,
    /// Total of debit lines in pence.
    #[serde(default)]
    pub debit_line_value: i64,
    /// `O`, `C` or `R`.
    pub rebilled_type: String,
    /// Licences on the invoice.
    #[serde(default)]
    pub licences: Vec<ViewedLicence>,
}

/// Licence within a viewed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedLicence {
    /// Charging Module licence id.
    pub id: Uuid,
    /// Licence reference.
    pub licence_number: String,
    /// Transactions for the licence.
    #[serde(default)]
    pub transactions: Vec<ViewedTransaction>,
}

/// Transaction within a viewed licence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedTransaction {
    /// Charging Module transaction id.
    pub id: Uuid,
    /// Unsigned charge in pence.
    pub charge_value: i64,
    /// True for a credit.
    pub credit: bool,
    /// Transaction this one reissues.
    #[serde(default)]
    pub rebilled_transaction_id: Option<Uuid>,
}

impl From<ViewedInvoice> for ExternalInvoice {
    fn from(invoice: ViewedInvoice) -> Self {
        Self {
            external_id: invoice.id,
            rebilled_type: invoice.rebilled_type,
            debit_line_value: invoice.debit_line_value,
            credit_line_value: invoice.credit_line_value,
            transactions: invoice
                .licences
                .into_iter()
                .flat_map(|licence| licence.transactions)
                .map(|transaction| ExternalTransaction {
                    external_id: transaction.id,
                    rebilled_transaction_id: transaction.rebilled_transaction_id,
                    charge_value: transaction.charge_value,
                    credit: transaction.credit,
                })
                .collect(),
        }
    }
}
