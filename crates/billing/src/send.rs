//! Sending a ready bill run through the Charging Module.
//!
//! `send` flips the bill run to `sending` and returns; approval, sending,
//! status polling and the final bookkeeping continue on a detached task:
//!
//! ```text
//! ready ──send()──▶ sending ──approve──▶ send ──poll──▶ view ──▶ sent
//! ```
//!
//! A failure after the flip leaves the bill run in `sending` and is reported
//! to the notifier.

use std::sync::Arc;
use std::time::Instant;

use riverbill_charging::models::ViewBillRunResponse;
use riverbill_charging::{ChargingError, ChargingModule, PollOptions, wait_for_status};
use riverbill_core::bill_run::{BillRun, BillRunStatus};
use riverbill_shared::types::BillRunId;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::notifier::Notifier;
use crate::store::BillingStore;
use crate::task::spawn_detached;

/// Charging Module statuses that mean a sent bill run is finished.
pub const SENT_STATUSES: [&str; 2] = ["billed", "billing_not_required"];

/// Drives a bill run from `ready` to `sent`.
#[derive(Clone)]
pub struct BillRunLifecycleCoordinator {
    store: Arc<dyn BillingStore>,
    charging_module: Arc<dyn ChargingModule>,
    notifier: Arc<dyn Notifier>,
    poll: PollOptions,
}

impl BillRunLifecycleCoordinator {
    /// Creates a coordinator.
    pub fn new(
        store: Arc<dyn BillingStore>,
        charging_module: Arc<dyn ChargingModule>,
        notifier: Arc<dyn Notifier>,
        poll: PollOptions,
    ) -> Self {
        Self {
            store,
            charging_module,
            notifier,
            poll,
        }
    }

    /// Starts sending a bill run.
    ///
    /// Returns `None` without doing anything unless the bill run is `ready`.
    /// Otherwise the bill run is moved to `sending` and the handle of the
    /// background task finishing the send is returned; callers may drop it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bill run, or a store error if the
    /// status cannot be changed.
    #[instrument(skip_all, fields(bill_run_id = %bill_run_id))]
    pub async fn send(&self, bill_run_id: BillRunId) -> Result<Option<JoinHandle<()>>, ServiceError> {
        let bill_run = self
            .store
            .find_bill_run(bill_run_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("bill run {bill_run_id}")))?;

        if !bill_run.status.can_send() {
            info!(status = %bill_run.status, "bill run is not ready to send");
            return Ok(None);
        }

        if !self
            .store
            .transition_bill_run_status(bill_run_id, BillRunStatus::Ready, BillRunStatus::Sending)
            .await?
        {
            info!("bill run left ready before it could be sent");
            return Ok(None);
        }

        let coordinator = self.clone();
        Ok(Some(spawn_detached(
            "send bill run",
            json!({ "bill_run_id": bill_run_id, "external_id": bill_run.external_id }),
            Arc::clone(&self.notifier),
            async move { coordinator.complete_send(&bill_run).await },
        )))
    }

    async fn complete_send(&self, bill_run: &BillRun) -> Result<(), ServiceError> {
        let started = Instant::now();
        let external_id = bill_run.external_id.ok_or_else(|| {
            ServiceError::NotFound(format!("Charging Module bill run for {}", bill_run.id))
        })?;
        let tag = move |err: ChargingError| ServiceError::charging(err, Some(external_id), None);

        self.charging_module
            .approve_bill_run(external_id)
            .await
            .ensure_succeeded("approve bill run")
            .map_err(tag)?;
        self.charging_module
            .send_bill_run(external_id)
            .await
            .ensure_succeeded("send bill run")
            .map_err(tag)?;

        let outcome = wait_for_status(
            self.charging_module.as_ref(),
            external_id,
            &SENT_STATUSES,
            self.poll,
        )
        .await
        .map_err(tag)?;
        if !outcome.succeeded {
            return Err(ServiceError::PollTimeout {
                bill_run_external_id: external_id,
                attempts: outcome.attempts,
                last_status: outcome.status,
            });
        }

        let viewed: ViewBillRunResponse = self
            .charging_module
            .view_bill_run(external_id)
            .await
            .parse("view bill run")
            .map_err(tag)?;
        let invoice_numbers = invoice_numbers(&viewed);
        let numbered = self
            .store
            .set_invoice_numbers(bill_run.id, &invoice_numbers)
            .await?;

        self.store
            .mark_bill_run_sent(bill_run.id, viewed.bill_run.transaction_file_reference)
            .await?;

        let unflagged = if bill_run.batch_type.is_supplementary() {
            self.store.unflag_billed_licences(bill_run.id).await?
        } else {
            0
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            bill_run_id = %bill_run.id,
            numbered,
            unflagged,
            elapsed_ms,
            "bill run sent"
        );
        self.notifier.info(
            "Send bill run complete",
            json!({
                "bill_run_id": bill_run.id,
                "numbered": numbered,
                "unflagged": unflagged,
                "elapsed_ms": elapsed_ms,
            }),
        );

        Ok(())
    }
}

fn invoice_numbers(viewed: &ViewBillRunResponse) -> Vec<(Uuid, String)> {
    viewed
        .bill_run
        .invoices
        .iter()
        .filter_map(|invoice| {
            invoice
                .transaction_reference
                .clone()
                .map(|number| (invoice.id, number))
        })
        .collect()
}
