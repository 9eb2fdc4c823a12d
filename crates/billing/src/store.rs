//! Local storage the orchestration services depend on.

use async_trait::async_trait;
use riverbill_core::bill_run::{BillRun, BillRunStatus, BillWithLicences, ReissueOutput};
use riverbill_db::repositories::{
    BillRepository, BillRunRepository, BillingAccountRepository, ChangeAddressInput,
    ChangedAddress, CustomerDetails, LicenceRepository,
};
use riverbill_shared::types::{BillRunId, BillingAccountId, RegionId};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Storage failure.
pub type StoreError = riverbill_db::RepositoryError;

/// Bill run, bill and customer storage.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Loads a bill run.
    async fn find_bill_run(&self, id: BillRunId) -> Result<Option<BillRun>, StoreError>;

    /// Moves a bill run from `from` to `to`; returns false if it was not in `from`.
    async fn transition_bill_run_status(
        &self,
        id: BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, StoreError>;

    /// Sets a bill run's status.
    async fn update_bill_run_status(
        &self,
        id: BillRunId,
        status: BillRunStatus,
    ) -> Result<(), StoreError>;

    /// Marks a bill run sent with its transaction file reference.
    async fn mark_bill_run_sent(
        &self,
        id: BillRunId,
        transaction_file_reference: Option<String>,
    ) -> Result<(), StoreError>;

    /// Stores invoice numbers against bills matched by Charging Module invoice id.
    async fn set_invoice_numbers(
        &self,
        id: BillRunId,
        invoice_numbers: &[(Uuid, String)],
    ) -> Result<u64, StoreError>;

    /// Clears the supplementary billing flag on licences billed in a bill run.
    async fn unflag_billed_licences(&self, id: BillRunId) -> Result<u64, StoreError>;

    /// Sent bills in a region that are flagged for rebilling.
    async fn find_bills_flagged_for_rebilling(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<BillWithLicences>, StoreError>;

    /// Stores the records a reissue produced, all or nothing.
    async fn persist_reissue(&self, output: &ReissueOutput) -> Result<(), StoreError>;

    /// Loads the customer details of a billing account.
    async fn find_customer(&self, id: BillingAccountId) -> Result<CustomerDetails, StoreError>;

    /// Replaces a billing account's address, all or nothing.
    async fn change_address(&self, input: &ChangeAddressInput)
    -> Result<ChangedAddress, StoreError>;
}

/// [`BillingStore`] backed by the Postgres repositories.
#[derive(Debug, Clone)]
pub struct DbBillingStore {
    bill_runs: BillRunRepository,
    bills: BillRepository,
    licences: LicenceRepository,
    billing_accounts: BillingAccountRepository,
}

impl DbBillingStore {
    /// Creates a store over one connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            bill_runs: BillRunRepository::new(db.clone()),
            bills: BillRepository::new(db.clone()),
            licences: LicenceRepository::new(db.clone()),
            billing_accounts: BillingAccountRepository::new(db),
        }
    }
}

#[async_trait]
impl BillingStore for DbBillingStore {
    async fn find_bill_run(&self, id: BillRunId) -> Result<Option<BillRun>, StoreError> {
        self.bill_runs.find_by_id(id).await
    }

    async fn transition_bill_run_status(
        &self,
        id: BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, StoreError> {
        self.bill_runs.transition_status(id, from, to).await
    }

    async fn update_bill_run_status(
        &self,
        id: BillRunId,
        status: BillRunStatus,
    ) -> Result<(), StoreError> {
        self.bill_runs.update_status(id, status).await
    }

    async fn mark_bill_run_sent(
        &self,
        id: BillRunId,
        transaction_file_reference: Option<String>,
    ) -> Result<(), StoreError> {
        self.bill_runs.mark_sent(id, transaction_file_reference).await
    }

    async fn set_invoice_numbers(
        &self,
        id: BillRunId,
        invoice_numbers: &[(Uuid, String)],
    ) -> Result<u64, StoreError> {
        self.bills.set_invoice_numbers(id, invoice_numbers).await
    }

    async fn unflag_billed_licences(&self, id: BillRunId) -> Result<u64, StoreError> {
        self.licences.unflag_billed(id).await
    }

    async fn find_bills_flagged_for_rebilling(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<BillWithLicences>, StoreError> {
        self.bills.find_flagged_for_rebilling(region_id).await
    }

    async fn persist_reissue(&self, output: &ReissueOutput) -> Result<(), StoreError> {
        self.bills.upsert_reissue(output).await
    }

    async fn find_customer(&self, id: BillingAccountId) -> Result<CustomerDetails, StoreError> {
        self.billing_accounts.find_customer(id).await
    }

    async fn change_address(
        &self,
        input: &ChangeAddressInput,
    ) -> Result<ChangedAddress, StoreError> {
        self.billing_accounts.change_address(input).await
    }
}
