//! Test doubles shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mockall::mock;
use riverbill_charging::models::CustomerChange;
use riverbill_charging::{ChargingModule, ChargingModuleInfo, RequestResult};
use riverbill_core::bill_run::{
    BatchType, Bill, BillLicence, BillLicenceWithTransactions, BillRun, BillRunStatus,
    BillWithLicences, ReissueOutput, Transaction,
};
use riverbill_core::billing::{ChargeType, TransactionLine};
use riverbill_db::RepositoryError;
use riverbill_db::repositories::{ChangeAddressInput, ChangedAddress, CustomerDetails};
use riverbill_shared::types::{
    AddressId, BillId, BillLicenceId, BillRunId, BillingAccountAddressId, BillingAccountId,
    ChargeElementId, LicenceId, RegionId, TransactionId,
};
use rust_decimal::Decimal;
use sea_orm::DbErr;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::notifier::Notifier;
use crate::store::{BillingStore, StoreError};

mock! {
    pub ChargingModuleApi {}

    #[async_trait]
    impl ChargingModule for ChargingModuleApi {
        async fn create_bill_run(&self, region_code: &str) -> RequestResult;
        async fn create_customer_change(&self, change: &CustomerChange) -> RequestResult;
        async fn view_bill_run(&self, bill_run_id: Uuid) -> RequestResult;
        async fn view_bill_run_status(&self, bill_run_id: Uuid) -> RequestResult;
        async fn approve_bill_run(&self, bill_run_id: Uuid) -> RequestResult;
        async fn send_bill_run(&self, bill_run_id: Uuid) -> RequestResult;
        async fn reissue_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult;
        async fn view_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult;
        async fn view_customer_files(&self, days: u32) -> RequestResult;
        async fn view_health(&self) -> RequestResult;
    }
}

/// A 200 response with `body`.
pub fn ok(body: Value) -> RequestResult {
    RequestResult::http(200, body, ChargingModuleInfo::default())
}

/// Scripts bill run status responses; once exhausted the bill run stays pending.
pub fn statuses(mock: &mut MockChargingModuleApi, sequence: &[&str]) {
    let queue: Mutex<VecDeque<String>> =
        Mutex::new(sequence.iter().map(|status| (*status).to_string()).collect());
    mock.expect_view_bill_run_status().returning(move |_| {
        let status = queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "pending".to_string());
        ok(json!({ "status": status }))
    });
}

pub fn bill_run(status: BillRunStatus, batch_type: BatchType) -> BillRun {
    BillRun {
        id: BillRunId::new(),
        region_id: RegionId::new(),
        external_id: Some(Uuid::new_v4()),
        bill_run_number: Some(10_001),
        status,
        batch_type,
        from_financial_year_ending: 2023,
        to_financial_year_ending: 2023,
        transaction_file_reference: None,
        created_at: Utc::now(),
    }
}

/// A sent bill with one licence and one sent transaction.
pub fn source_bill(original_bill_id: Option<BillId>) -> BillWithLicences {
    let bill = Bill {
        id: BillId::new(),
        bill_run_id: BillRunId::new(),
        billing_account_id: BillingAccountId::new(),
        account_number: "A12345678A".to_string(),
        external_id: Some(Uuid::new_v4()),
        invoice_number: Some("WAI1000001".to_string()),
        financial_year_ending: 2023,
        net_amount: 2_500,
        is_credit: false,
        flagged_for_rebilling: true,
        rebilling_state: None,
        original_bill_id,
    };
    let bill_licence = BillLicence {
        id: BillLicenceId::new(),
        bill_id: bill.id,
        licence_id: LicenceId::new(),
        licence_ref: "01/123".to_string(),
    };
    let transaction = Transaction {
        bill_licence_id: bill_licence.id,
        net_amount: Some(2_500),
        line: TransactionLine {
            id: TransactionId::new(),
            charge_element_id: ChargeElementId::new(),
            start_date: NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            source: "non-tidal".to_string(),
            season: "all year".to_string(),
            loss: "low".to_string(),
            is_credit: false,
            charge_type: ChargeType::Standard,
            authorised_quantity: Decimal::TEN,
            billable_quantity: Decimal::TEN,
            authorised_days: 365,
            billable_days: 365,
            status: "charge_created".to_string(),
            description: "Water abstraction charge: Borehole".to_string(),
            volume: Decimal::TEN,
            section_126_factor: Decimal::ONE,
            section_127_agreement: false,
            section_130_agreement: false,
            second_part_charge: false,
            scheme: "sroc".to_string(),
            aggregate_factor: Decimal::ONE,
            adjustment_factor: Decimal::ONE,
            charge_category_code: "4.3.1".to_string(),
            charge_category_description: "Low loss, non-tidal".to_string(),
            is_winter_only: false,
            supported_source: false,
            supported_source_name: None,
            water_company_charge: false,
            water_undertaker: false,
            is_new_licence: false,
            purposes: vec![],
            external_id: Some(Uuid::new_v4()),
        },
    };

    BillWithLicences {
        bill,
        bill_licences: vec![BillLicenceWithTransactions {
            bill_licence,
            transactions: vec![transaction],
        }],
    }
}

#[derive(Default)]
struct State {
    bill_runs: HashMap<BillRunId, BillRun>,
    invoice_numbers: Vec<(Uuid, String)>,
    unflagged: Vec<BillRunId>,
    flagged: Vec<BillWithLicences>,
    persisted: Vec<ReissueOutput>,
    customers: HashMap<BillingAccountId, CustomerDetails>,
    address_changes: Vec<ChangeAddressInput>,
    fail_status_updates: bool,
}

/// [`BillingStore`] kept in memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

fn not_found(entity: &'static str, id: impl ToString) -> StoreError {
    RepositoryError::NotFound {
        entity,
        id: id.to_string(),
    }
}

impl InMemoryStore {
    pub fn with_bill_run(bill_run: BillRun) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().bill_runs.insert(bill_run.id, bill_run);
        store
    }

    /// Makes every later `update_bill_run_status` call fail.
    pub fn fail_status_updates(&self) {
        self.state.lock().unwrap().fail_status_updates = true;
    }

    pub fn flag(&self, bill: BillWithLicences) {
        self.state.lock().unwrap().flagged.push(bill);
    }

    pub fn add_customer(&self, id: BillingAccountId, customer: CustomerDetails) {
        self.state.lock().unwrap().customers.insert(id, customer);
    }

    pub fn bill_run(&self, id: BillRunId) -> Option<BillRun> {
        self.state.lock().unwrap().bill_runs.get(&id).cloned()
    }

    pub fn customer(&self, id: BillingAccountId) -> Option<CustomerDetails> {
        self.state.lock().unwrap().customers.get(&id).cloned()
    }

    pub fn invoice_numbers(&self) -> Vec<(Uuid, String)> {
        self.state.lock().unwrap().invoice_numbers.clone()
    }

    pub fn unflagged(&self) -> Vec<BillRunId> {
        self.state.lock().unwrap().unflagged.clone()
    }

    pub fn persisted(&self) -> Vec<ReissueOutput> {
        self.state.lock().unwrap().persisted.clone()
    }

    pub fn address_changes(&self) -> Vec<ChangeAddressInput> {
        self.state.lock().unwrap().address_changes.clone()
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn find_bill_run(&self, id: BillRunId) -> Result<Option<BillRun>, StoreError> {
        Ok(self.bill_run(id))
    }

    async fn transition_bill_run_status(
        &self,
        id: BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.bill_runs.get_mut(&id) {
            Some(bill_run) if bill_run.status == from => {
                bill_run.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_bill_run_status(
        &self,
        id: BillRunId,
        status: BillRunStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status_updates {
            return Err(RepositoryError::Database(DbErr::Custom(
                "connection reset".to_string(),
            )));
        }
        let bill_run = state
            .bill_runs
            .get_mut(&id)
            .ok_or_else(|| not_found("bill run", id))?;
        bill_run.status = status;
        Ok(())
    }

    async fn mark_bill_run_sent(
        &self,
        id: BillRunId,
        transaction_file_reference: Option<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let bill_run = state
            .bill_runs
            .get_mut(&id)
            .ok_or_else(|| not_found("bill run", id))?;
        bill_run.status = BillRunStatus::Sent;
        bill_run.transaction_file_reference = transaction_file_reference;
        Ok(())
    }

    async fn set_invoice_numbers(
        &self,
        _id: BillRunId,
        invoice_numbers: &[(Uuid, String)],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.invoice_numbers.extend_from_slice(invoice_numbers);
        Ok(invoice_numbers.len() as u64)
    }

    async fn unflag_billed_licences(&self, id: BillRunId) -> Result<u64, StoreError> {
        self.state.lock().unwrap().unflagged.push(id);
        Ok(1)
    }

    async fn find_bills_flagged_for_rebilling(
        &self,
        _region_id: RegionId,
    ) -> Result<Vec<BillWithLicences>, StoreError> {
        Ok(self.state.lock().unwrap().flagged.clone())
    }

    async fn persist_reissue(&self, output: &ReissueOutput) -> Result<(), StoreError> {
        self.state.lock().unwrap().persisted.push(output.clone());
        Ok(())
    }

    async fn find_customer(&self, id: BillingAccountId) -> Result<CustomerDetails, StoreError> {
        self.customer(id)
            .ok_or_else(|| not_found("billing account", id))
    }

    async fn change_address(
        &self,
        input: &ChangeAddressInput,
    ) -> Result<ChangedAddress, StoreError> {
        self.state.lock().unwrap().address_changes.push(input.clone());
        Ok(ChangedAddress {
            billing_account_address_id: BillingAccountAddressId::new(),
            address_id: AddressId::new(),
            company_id: None,
            contact_id: None,
        })
    }
}

/// Notifier that keeps what it was told.
#[derive(Default)]
pub struct RecordingNotifier {
    infos: Mutex<Vec<(String, Value)>>,
    errors: Mutex<Vec<(String, Value)>>,
}

impl RecordingNotifier {
    pub fn infos(&self) -> Vec<(String, Value)> {
        self.infos.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, Value)> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str, context: Value) {
        self.infos.lock().unwrap().push((message.to_string(), context));
    }

    fn error(&self, message: &str, context: Value) {
        self.errors.lock().unwrap().push((message.to_string(), context));
    }
}
