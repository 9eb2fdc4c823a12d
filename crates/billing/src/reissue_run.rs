//! Populating a reissue bill run from bills flagged for rebilling.

use std::sync::Arc;

use riverbill_core::bill_run::{BillRun, BillRunStatus, ReissueOutput};
use riverbill_shared::types::BillRunId;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::error::ServiceError;
use crate::notifier::Notifier;
use crate::reissue::ReissueOrchestrator;
use crate::store::BillingStore;
use crate::task::spawn_detached;

/// Reissues every flagged bill in a bill run's region into that bill run.
#[derive(Clone)]
pub struct ReissueBillRunService {
    store: Arc<dyn BillingStore>,
    orchestrator: ReissueOrchestrator,
    notifier: Arc<dyn Notifier>,
}

impl ReissueBillRunService {
    /// Creates the service.
    pub fn new(
        store: Arc<dyn BillingStore>,
        orchestrator: ReissueOrchestrator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            notifier,
        }
    }

    /// Runs [`Self::process`] on a detached task; a failure is reported to
    /// the notifier.
    pub fn trigger(&self, bill_run_id: BillRunId) -> JoinHandle<()> {
        let service = self.clone();
        spawn_detached(
            "reissue bill run",
            json!({ "bill_run_id": bill_run_id }),
            Arc::clone(&self.notifier),
            async move { service.process(bill_run_id).await.map(|_| ()) },
        )
    }

    /// Reissues the flagged bills and stores the results in one transaction.
    ///
    /// The bill run ends `ready`, or `empty` when nothing was flagged. On
    /// failure it is set to `error` and nothing reissued is stored.
    /// Progress is reported to the notifier.
    ///
    /// # Errors
    ///
    /// Returns the first failure. A failure to set `error` afterwards is
    /// logged and does not replace it.
    #[instrument(skip_all, fields(bill_run_id = %bill_run_id))]
    pub async fn process(&self, bill_run_id: BillRunId) -> Result<BillRunStatus, ServiceError> {
        let bill_run = self
            .store
            .find_bill_run(bill_run_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("bill run {bill_run_id}")))?;

        match self.reissue_flagged(&bill_run).await {
            Ok(status) => Ok(status),
            Err(err) => {
                error!(error = %err, code = err.error_code(), "reissue failed");
                if let Err(store_err) = self
                    .store
                    .update_bill_run_status(bill_run_id, BillRunStatus::Error)
                    .await
                {
                    error!(error = %store_err, "failed to mark bill run as errored");
                }
                Err(err)
            }
        }
    }

    async fn reissue_flagged(&self, bill_run: &BillRun) -> Result<BillRunStatus, ServiceError> {
        let sources = self
            .store
            .find_bills_flagged_for_rebilling(bill_run.region_id)
            .await?;

        let mut output = ReissueOutput::default();
        for source in &sources {
            output.extend(self.orchestrator.reissue(source, bill_run).await?);
        }

        let status = if output.is_empty() {
            BillRunStatus::Empty
        } else {
            self.store.persist_reissue(&output).await?;
            BillRunStatus::Ready
        };
        self.store.update_bill_run_status(bill_run.id, status).await?;

        info!(
            reissued = sources.len(),
            bills = output.bills.len(),
            transactions = output.transactions.len(),
            status = %status,
            "reissue complete"
        );
        self.notifier.info(
            "Reissue bill run complete",
            json!({
                "bill_run_id": bill_run.id,
                "reissued": sources.len(),
                "status": status.as_str(),
            }),
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use riverbill_charging::{ChargingModuleInfo, RequestResult};
    use riverbill_core::bill_run::BatchType;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::testing::{
        InMemoryStore, MockChargingModuleApi, RecordingNotifier, bill_run, ok, source_bill,
        statuses,
    };

    fn service(
        store: &Arc<InMemoryStore>,
        charging_module: MockChargingModuleApi,
        notifier: &Arc<RecordingNotifier>,
    ) -> ReissueBillRunService {
        ReissueBillRunService::new(
            store.clone(),
            ReissueOrchestrator::new(Arc::new(charging_module), Duration::ZERO),
            notifier.clone(),
        )
    }

    #[tokio::test]
    async fn test_nothing_flagged_leaves_bill_run_empty() {
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);
        let store = Arc::new(InMemoryStore::with_bill_run(run.clone()));
        let notifier = Arc::new(RecordingNotifier::default());

        let status = service(&store, MockChargingModuleApi::new(), &notifier)
            .process(run.id)
            .await
            .unwrap();

        assert_eq!(status, BillRunStatus::Empty);
        assert_eq!(store.bill_run(run.id).unwrap().status, BillRunStatus::Empty);
        assert!(store.persisted().is_empty());
    }

    #[tokio::test]
    async fn test_flagged_bill_is_reissued_and_stored() {
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);
        let source = source_bill(None);
        let source_transaction = source.bill_licences[0].transactions[0]
            .line
            .external_id
            .unwrap();
        let store = Arc::new(InMemoryStore::with_bill_run(run.clone()));
        store.flag(source.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let rebill_id = Uuid::new_v4();

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill().times(1).returning(move |_, _| {
            ok(json!({ "invoices": [{ "id": rebill_id, "rebilledType": "R" }] }))
        });
        statuses(&mut cm, &["initialised"]);
        cm.expect_view_bill().times(1).returning(move |_, _| {
            ok(json!({
                "invoice": {
                    "id": rebill_id,
                    "creditLineValue": 0,
                    "debitLineValue": 2_500,
                    "rebilledType": "R",
                    "licences": [{
                        "id": Uuid::new_v4(),
                        "licenceNumber": "01/123",
                        "transactions": [{
                            "id": Uuid::new_v4(),
                            "chargeValue": 2_500,
                            "credit": false,
                            "rebilledTransactionId": source_transaction
                        }]
                    }]
                }
            }))
        });

        let status = service(&store, cm, &notifier).process(run.id).await.unwrap();

        assert_eq!(status, BillRunStatus::Ready);
        let persisted = store.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].bills.len(), 2);
        assert_eq!(persisted[0].bills[1].id, source.bill.id);
        assert!(!persisted[0].bills[1].flagged_for_rebilling);
        assert_eq!(persisted[0].transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_sets_error_status_and_notifies() {
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);
        let store = Arc::new(InMemoryStore::with_bill_run(run.clone()));
        store.flag(source_bill(None));
        let notifier = Arc::new(RecordingNotifier::default());

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill().returning(|_, _| {
            RequestResult::http(500, json!({ "message": "boom" }), ChargingModuleInfo::default())
        });

        let handle = service(&store, cm, &notifier).trigger(run.id);
        handle.await.unwrap();

        assert_eq!(store.bill_run(run.id).unwrap().status, BillRunStatus::Error);
        assert!(store.persisted().is_empty());
        let errors = notifier.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "reissue bill run failed");
        assert_eq!(errors[0].1["code"], "EXTERNAL_CALL_FAILED");
        assert_eq!(errors[0].1["context"]["bill_run_id"], run.id.to_string());
    }

    #[tokio::test]
    async fn test_reissue_error_survives_failed_status_update() {
        let run = bill_run(BillRunStatus::Processing, BatchType::Supplementary);
        let store = Arc::new(InMemoryStore::with_bill_run(run.clone()));
        store.flag(source_bill(None));
        store.fail_status_updates();
        let notifier = Arc::new(RecordingNotifier::default());

        let mut cm = MockChargingModuleApi::new();
        cm.expect_reissue_bill().returning(|_, _| {
            RequestResult::http(500, json!({ "message": "boom" }), ChargingModuleInfo::default())
        });

        let err = service(&store, cm, &notifier)
            .process(run.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::ExternalCallFailed {
                operation: "reissue bill",
                status_code: Some(500),
                ..
            }
        ));
        assert_eq!(err.error_code(), "EXTERNAL_CALL_FAILED");
        assert_eq!(
            store.bill_run(run.id).unwrap().status,
            BillRunStatus::Processing
        );
    }
}
