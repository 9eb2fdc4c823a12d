//! The Charging Module operations Riverbill depends on.

use async_trait::async_trait;
use uuid::Uuid;

use crate::envelope::RequestResult;
use crate::models::CustomerChange;

/// Charging Module API.
///
/// Each operation resolves to a [`RequestResult`]; transport failures are
/// reported inside the envelope rather than as errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChargingModule: Send + Sync {
    /// Creates a bill run for a region.
    async fn create_bill_run(&self, region_code: &str) -> RequestResult;

    /// Sends changed customer details.
    async fn create_customer_change(&self, change: &CustomerChange) -> RequestResult;

    /// Fetches a bill run with its invoice summaries.
    async fn view_bill_run(&self, bill_run_id: Uuid) -> RequestResult;

    /// Fetches a bill run's status.
    async fn view_bill_run_status(&self, bill_run_id: Uuid) -> RequestResult;

    /// Approves a bill run.
    async fn approve_bill_run(&self, bill_run_id: Uuid) -> RequestResult;

    /// Sends an approved bill run.
    async fn send_bill_run(&self, bill_run_id: Uuid) -> RequestResult;

    /// Cancels and rebills an invoice into another bill run.
    async fn reissue_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult;

    /// Fetches an invoice with its licences and transactions.
    async fn view_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult;

    /// Lists customer files exported in the last `days` days.
    async fn view_customer_files(&self, days: u32) -> RequestResult;

    /// Fetches the service status.
    async fn view_health(&self) -> RequestResult;
}
