//! Reissue mapping errors.

use thiserror::Error;
use uuid::Uuid;

use riverbill_shared::types::TransactionId;

/// Errors raised while mapping a Charging Module reissue onto local records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReissueError {
    /// The bill being reissued was never sent to the Charging Module.
    #[error("Bill {0} has no Charging Module invoice id")]
    SourceBillNotSent(String),

    /// A source transaction has no Charging Module transaction id to match on.
    #[error("Transaction {0} has no Charging Module transaction id")]
    SourceTransactionNotSent(TransactionId),

    /// The reissued invoice has no transaction rebilling the source transaction.
    #[error("Invoice {invoice_external_id} has no transaction rebilling {source_external_id}")]
    MissingRebilledTransaction {
        /// Charging Module id of the reissued invoice.
        invoice_external_id: Uuid,
        /// Charging Module id of the source transaction.
        source_external_id: Uuid,
    },

    /// Rebilled type code not recognised.
    #[error("Unknown rebilled type '{0}'")]
    UnknownRebilledType(String),
}

impl ReissueError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceBillNotSent(_) => "SOURCE_BILL_NOT_SENT",
            Self::SourceTransactionNotSent(_) => "SOURCE_TRANSACTION_NOT_SENT",
            Self::MissingRebilledTransaction { .. } => "MISSING_REBILLED_TRANSACTION",
            Self::UnknownRebilledType(_) => "UNKNOWN_REBILLED_TYPE",
        }
    }
}
