//! Reissue mapping: rebuilding local bills from a Charging Module reissue.
//!
//! Reissuing a bill asks the Charging Module to cancel it and bill it again.
//! The Charging Module answers with new invoices (normally a reversal and a
//! rebill). This module turns those invoices into local bills, bill licences
//! and transactions. It performs no I/O; fetching the invoices is the
//! caller's job.
//!
//! Every bill in a reissue chain points at the root bill through
//! `original_bill_id`, never at an intermediate reissue.

use riverbill_shared::types::{BillId, BillLicenceId, BillingAccountId, LicenceId, TransactionId};
use uuid::Uuid;

use super::error::ReissueError;
use super::types::{Bill, BillLicence, BillRun, BillWithLicences, RebillingState, Transaction};
use crate::billing::TransactionLine;

/// A reissued invoice as reported by the Charging Module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInvoice {
    /// Charging Module invoice id.
    pub external_id: Uuid,
    /// Rebilled type code: `C` (cancel), `R` (rebill) or `O` (original).
    pub rebilled_type: String,
    /// Total of debit lines in pence, never negative.
    pub debit_line_value: i64,
    /// Total of credit lines in pence, never negative.
    pub credit_line_value: i64,
    /// Transactions across every licence on the invoice.
    pub transactions: Vec<ExternalTransaction>,
}

impl ExternalInvoice {
    /// Signed net amount; negative when credits outweigh debits.
    #[must_use]
    pub fn net_amount(&self) -> i64 {
        self.debit_line_value - self.credit_line_value
    }

    fn rebilled_transaction(&self, source_external_id: Uuid) -> Option<&ExternalTransaction> {
        self.transactions
            .iter()
            .find(|t| t.rebilled_transaction_id == Some(source_external_id))
    }
}

/// A transaction on a reissued invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTransaction {
    /// Charging Module transaction id.
    pub external_id: Uuid,
    /// The transaction this one rebills.
    pub rebilled_transaction_id: Option<Uuid>,
    /// Charge value in pence, never negative.
    pub charge_value: i64,
    /// Whether the charge is a credit.
    pub credit: bool,
}

/// Records produced by a reissue, ready to be upserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReissueOutput {
    /// New bills, followed by the source bill marked as rebilled.
    pub bills: Vec<Bill>,
    /// Bill licences under the new bills.
    pub bill_licences: Vec<BillLicence>,
    /// Transactions under the new bill licences.
    pub transactions: Vec<Transaction>,
}

impl ReissueOutput {
    /// Appends another reissue's records.
    pub fn extend(&mut self, other: Self) {
        self.bills.extend(other.bills);
        self.bill_licences.extend(other.bill_licences);
        self.transactions.extend(other.transactions);
    }

    /// True when no bill was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }

    fn find_or_create_bill(
        &mut self,
        billing_account_id: BillingAccountId,
        external_id: Uuid,
        create: impl FnOnce() -> Bill,
    ) -> usize {
        if let Some(index) = self.bills.iter().position(|bill| {
            bill.billing_account_id == billing_account_id && bill.external_id == Some(external_id)
        }) {
            return index;
        }
        self.bills.push(create());
        self.bills.len() - 1
    }

    fn find_or_create_bill_licence(
        &mut self,
        bill_id: BillId,
        licence_id: LicenceId,
        create: impl FnOnce() -> BillLicence,
    ) -> BillLicenceId {
        if let Some(existing) = self
            .bill_licences
            .iter()
            .find(|bl| bl.bill_id == bill_id && bl.licence_id == licence_id)
        {
            return existing.id;
        }
        let bill_licence = create();
        let id = bill_licence.id;
        self.bill_licences.push(bill_licence);
        id
    }

    /// Keeps one transaction per `(bill_licence_id, external_id)`.
    fn push_transaction(&mut self, transaction: Transaction) {
        let exists = self.transactions.iter().any(|t| {
            t.bill_licence_id == transaction.bill_licence_id
                && t.line.external_id == transaction.line.external_id
        });
        if !exists {
            self.transactions.push(transaction);
        }
    }
}

/// The root of the reissue chain `bill` belongs to.
#[must_use]
pub fn lineage_root(bill: &Bill) -> BillId {
    bill.original_bill_id.unwrap_or(bill.id)
}

/// Applies the local sign convention: credits are negative.
#[must_use]
pub fn signed_amount(value: i64, is_credit: bool) -> i64 {
    if is_credit { -value } else { value }
}

impl RebillingState {
    /// Maps a Charging Module rebilled type code. `O` marks an original
    /// invoice and has no rebilling state.
    pub fn from_rebilled_type(code: &str) -> Result<Option<Self>, ReissueError> {
        match code {
            "C" => Ok(Some(Self::Reversal)),
            "R" => Ok(Some(Self::Rebill)),
            "O" => Ok(None),
            other => Err(ReissueError::UnknownRebilledType(other.to_string())),
        }
    }
}

/// Stateless reissue mapping.
pub struct ReissueService;

impl ReissueService {
    /// Builds the local records for `source` reissued into `bill_run` as
    /// `invoices`, then appends the source bill marked as rebilled.
    ///
    /// Bills are found or created by `(billing_account_id, external_id)` and
    /// bill licences by `(bill_id, licence_id)` and transactions by
    /// `(bill_licence_id, external_id)`, so repeated invoice ids never produce
    /// duplicates. Any number of invoices is accepted.
    pub fn reissue(
        source: &BillWithLicences,
        bill_run: &BillRun,
        invoices: &[ExternalInvoice],
    ) -> Result<ReissueOutput, ReissueError> {
        let mut output = ReissueOutput::default();

        for invoice in invoices {
            let rebilling_state = RebillingState::from_rebilled_type(&invoice.rebilled_type)?;
            let bill_index = output.find_or_create_bill(
                source.bill.billing_account_id,
                invoice.external_id,
                || Self::reissue_bill(&source.bill, bill_run, invoice, rebilling_state),
            );
            let bill_id = output.bills[bill_index].id;

            for source_licence in &source.bill_licences {
                let bill_licence_id = output.find_or_create_bill_licence(
                    bill_id,
                    source_licence.bill_licence.licence_id,
                    || BillLicence {
                        id: BillLicenceId::new(),
                        bill_id,
                        licence_id: source_licence.bill_licence.licence_id,
                        licence_ref: source_licence.bill_licence.licence_ref.clone(),
                    },
                );

                for source_transaction in &source_licence.transactions {
                    let source_external_id = source_transaction
                        .line
                        .external_id
                        .ok_or(ReissueError::SourceTransactionNotSent(source_transaction.line.id))?;

                    let external = invoice.rebilled_transaction(source_external_id).ok_or(
                        ReissueError::MissingRebilledTransaction {
                            invoice_external_id: invoice.external_id,
                            source_external_id,
                        },
                    )?;

                    output.push_transaction(Self::reissue_transaction(
                        source_transaction,
                        bill_licence_id,
                        external,
                    ));
                }
            }
        }

        let mut rebilled = source.bill.clone();
        Self::mark_rebilled(&mut rebilled);
        output.bills.push(rebilled);

        Ok(output)
    }

    /// Marks a bill as reissued, pointing it at the root of its chain.
    pub fn mark_rebilled(bill: &mut Bill) {
        bill.original_bill_id = Some(lineage_root(bill));
        bill.rebilling_state = Some(RebillingState::Rebilled);
        bill.flagged_for_rebilling = false;
    }

    fn reissue_bill(
        source: &Bill,
        bill_run: &BillRun,
        invoice: &ExternalInvoice,
        rebilling_state: Option<RebillingState>,
    ) -> Bill {
        let net_amount = invoice.net_amount();
        Bill {
            id: BillId::new(),
            bill_run_id: bill_run.id,
            billing_account_id: source.billing_account_id,
            account_number: source.account_number.clone(),
            external_id: Some(invoice.external_id),
            invoice_number: None,
            financial_year_ending: source.financial_year_ending,
            net_amount,
            is_credit: net_amount < 0,
            flagged_for_rebilling: false,
            rebilling_state,
            original_bill_id: Some(lineage_root(source)),
        }
    }

    fn reissue_transaction(
        source: &Transaction,
        bill_licence_id: BillLicenceId,
        external: &ExternalTransaction,
    ) -> Transaction {
        Transaction {
            bill_licence_id,
            net_amount: Some(signed_amount(external.charge_value, external.credit)),
            line: TransactionLine {
                id: TransactionId::new(),
                external_id: Some(external.external_id),
                is_credit: external.credit,
                ..source.line.clone()
            },
        }
    }
}
