//! Reissuing a sent bill through the Charging Module.

use std::sync::Arc;
use std::time::Duration;

use riverbill_charging::models::{ReissueResponse, ViewInvoiceResponse};
use riverbill_charging::{ChargingError, ChargingModule, PollOptions, wait_while_pending};
use riverbill_core::bill_run::{
    BillRun, BillWithLicences, ExternalInvoice, ReissueError, ReissueOutput, ReissueService,
};
use tracing::{debug, instrument};

use crate::error::ServiceError;

/// Asks the Charging Module to cancel and rebill a bill, then maps the
/// resulting invoices onto local records.
#[derive(Clone)]
pub struct ReissueOrchestrator {
    charging_module: Arc<dyn ChargingModule>,
    poll_interval: Duration,
}

impl ReissueOrchestrator {
    /// Creates an orchestrator polling at `poll_interval`.
    pub fn new(charging_module: Arc<dyn ChargingModule>, poll_interval: Duration) -> Self {
        Self {
            charging_module,
            poll_interval,
        }
    }

    /// Reissues `source` into `bill_run`.
    ///
    /// Nothing is stored; the caller persists the returned records.
    ///
    /// # Errors
    ///
    /// Any failed Charging Module call is fatal and carries the bill run and
    /// invoice ids. Mapping failures surface as [`ServiceError::Reissue`].
    #[instrument(skip_all, fields(bill_id = %source.bill.id, bill_run_id = %bill_run.id))]
    pub async fn reissue(
        &self,
        source: &BillWithLicences,
        bill_run: &BillRun,
    ) -> Result<ReissueOutput, ServiceError> {
        let bill_run_external_id = bill_run.external_id.ok_or_else(|| {
            ServiceError::NotFound(format!("Charging Module bill run for {}", bill_run.id))
        })?;
        let source_external_id = source
            .bill
            .external_id
            .ok_or_else(|| ReissueError::SourceBillNotSent(source.bill.id.to_string()))?;
        let tag = move |err: ChargingError| {
            ServiceError::charging(err, Some(bill_run_external_id), Some(source_external_id))
        };

        let reissued: ReissueResponse = self
            .charging_module
            .reissue_bill(bill_run_external_id, source_external_id)
            .await
            .parse("reissue bill")
            .map_err(tag)?;

        // The Charging Module regenerates the bill run; wait for it to settle.
        let outcome = wait_while_pending(
            self.charging_module.as_ref(),
            bill_run_external_id,
            PollOptions {
                interval: self.poll_interval,
                max_attempts: None,
            },
        )
        .await
        .map_err(tag)?;
        debug!(status = %outcome.status, attempts = outcome.attempts, "reissue settled");

        let mut invoices = Vec::with_capacity(reissued.invoices.len());
        for summary in &reissued.invoices {
            let viewed: ViewInvoiceResponse = self
                .charging_module
                .view_bill(bill_run_external_id, summary.id)
                .await
                .parse("view bill")
                .map_err(|err| {
                    ServiceError::charging(err, Some(bill_run_external_id), Some(summary.id))
                })?;
            invoices.push(ExternalInvoice::from(viewed.invoice));
        }

        Ok(ReissueService::reissue(source, bill_run, &invoices)?)
    }
}

#[cfg(test)]
mod tests {
    use riverbill_charging::{ChargingModuleInfo, RequestResult};
    use riverbill_core::bill_run::{BatchType, BillRunStatus, RebillingState};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::testing::{MockChargingModuleApi, bill_run, ok, source_bill, statuses};

    fn orchestrator(charging_module: MockChargingModuleApi) -> ReissueOrchestrator {
        ReissueOrchestrator::new(Arc::new(charging_module), Duration::ZERO)
    }

    fn viewed_invoice(id: Uuid, rebilled_type: &str, credit: bool, rebills: Uuid) -> RequestResult {
        let (credit_value, debit_value) = if credit { (2_500, 0) } else { (0, 2_500) };
        ok(json!({
            "invoice": {
                "id": id,
                "creditLineValue": credit_value,
                "debitLineValue": debit_value,
                "rebilledType": rebilled_type,
                "licences": [{
                    "id": Uuid::new_v4(),
                    "licenceNumber": "01/123",
                    "transactions": [{
                        "id": Uuid::new_v4(),
                        "chargeValue": 2_500,
                        "credit": credit,
                        "rebilledTransactionId": rebills
                    }]
                }]
            }
        }))
    }

    #[tokio::test]
    async fn test_reissue_maps_cancel_and_rebill_invoices() {
        let source = source_bill(None);
        let source_external = source.bill.external_id.unwrap();
        let source_transaction = source.bill_licences[0].transactions[0]
            .line
            .external_id
            .unwrap();
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);
        let run_external = run.external_id.unwrap();
        let cancel_id = Uuid::new_v4();
        let rebill_id = Uuid::new_v4();

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill()
            .withf(move |bill_run_id, invoice_id| {
                *bill_run_id == run_external && *invoice_id == source_external
            })
            .times(1)
            .returning(move |_, _| {
                ok(json!({
                    "invoices": [
                        { "id": cancel_id, "rebilledType": "C" },
                        { "id": rebill_id, "rebilledType": "R" }
                    ]
                }))
            });
        statuses(&mut cm, &["pending", "pending", "initialised"]);
        cm.expect_view_bill().times(2).returning(move |_, invoice_id| {
            if invoice_id == cancel_id {
                viewed_invoice(cancel_id, "C", true, source_transaction)
            } else {
                viewed_invoice(rebill_id, "R", false, source_transaction)
            }
        });

        let output = orchestrator(cm).reissue(&source, &run).await.unwrap();

        assert_eq!(output.bills.len(), 3);
        assert_eq!(output.bills[0].external_id, Some(cancel_id));
        assert_eq!(output.bills[0].rebilling_state, Some(RebillingState::Reversal));
        assert_eq!(output.bills[0].net_amount, -2_500);
        assert_eq!(output.bills[1].rebilling_state, Some(RebillingState::Rebill));
        assert_eq!(output.bills[2].id, source.bill.id);
        assert_eq!(output.bills[2].rebilling_state, Some(RebillingState::Rebilled));
        assert_eq!(output.transactions.len(), 2);
        assert_eq!(output.transactions[0].net_amount, Some(-2_500));
    }

    #[tokio::test]
    async fn test_unsent_source_bill_is_rejected_before_calling_out() {
        let mut source = source_bill(None);
        source.bill.external_id = None;
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);

        let result = orchestrator(MockChargingModuleApi::new())
            .reissue(&source, &run)
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Reissue(ReissueError::SourceBillNotSent(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_reissue_request_carries_ids() {
        let source = source_bill(None);
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill().returning(|_, _| {
            RequestResult::http(
                422,
                json!({ "message": "Invoice has already been rebilled" }),
                ChargingModuleInfo::default(),
            )
        });
        cm.expect_view_bill_run_status().times(0);

        let result = orchestrator(cm).reissue(&source, &run).await;

        match result {
            Err(ServiceError::ExternalCallFailed {
                operation,
                bill_run_external_id,
                bill_external_id,
                status_code,
                body,
            }) => {
                assert_eq!(operation, "reissue bill");
                assert_eq!(bill_run_external_id, run.external_id);
                assert_eq!(bill_external_id, source.bill.external_id);
                assert_eq!(status_code, Some(422));
                assert!(body.contains("already been rebilled"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_status_poll_is_fatal() {
        let source = source_bill(None);
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill()
            .returning(|_, _| ok(json!({ "invoices": [] })));
        cm.expect_view_bill_run_status()
            .times(1)
            .returning(|_| RequestResult::error("connection reset"));
        cm.expect_view_bill().times(0);

        let result = orchestrator(cm).reissue(&source, &run).await;

        assert!(matches!(
            result,
            Err(ServiceError::ExternalCallFailed {
                status_code: None,
                ..
            })
        ));
    }
}
