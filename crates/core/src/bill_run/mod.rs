//! Bill run, bill and transaction domain model, and the reissue mapping rules.

pub mod error;
pub mod reissue;
pub mod types;

pub use error::ReissueError;
pub use reissue::{
    ExternalInvoice, ExternalTransaction, ReissueOutput, ReissueService, lineage_root,
    signed_amount,
};
pub use types::{
    BatchType, Bill, BillLicence, BillLicenceWithTransactions, BillRun, BillRunStatus,
    BillWithLicences, RebillingState, Transaction,
};
