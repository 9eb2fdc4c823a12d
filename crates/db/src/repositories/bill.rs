//! Bill, bill licence and transaction repository.
//!
//! Bills and bill licences are written with upserts keyed on their natural
//! keys:
//!
//! | Table | Natural key | Updated on conflict |
//! |---|---|---|
//! | bills | `(bill_run_id, billing_account_id, external_id)` | `net_amount`, `is_credit`, `flagged_for_rebilling`, `rebilling_state`, `original_bill_id`, `updated_at` |
//! | bill_licences | `(bill_id, licence_id)` | `licence_ref`, `updated_at` |
//! | transactions | `id` | `external_id`, `updated_at` |

use std::collections::HashMap;

use riverbill_core::bill_run::{
    Bill, BillLicence, BillLicenceWithTransactions, BillRunStatus, BillWithLicences,
    RebillingState, ReissueOutput, Transaction,
};
use riverbill_core::billing::{ChargeType, TransactionLine};
use riverbill_shared::types::{
    BillId, BillLicenceId, BillRunId, BillingAccountId, ChargeElementId, LicenceId, RegionId,
    TransactionId,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use super::error::RepositoryError;
use crate::entities::{bill_licences, bill_runs, bills, transactions};

/// Bill repository.
#[derive(Debug, Clone)]
pub struct BillRepository {
    db: DatabaseConnection,
}

impl BillRepository {
    /// Creates a new bill repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the bills in a bill run.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is invalid.
    pub async fn find_by_bill_run(&self, bill_run_id: BillRunId) -> Result<Vec<Bill>, RepositoryError> {
        bills::Entity::find()
            .filter(bills::Column::BillRunId.eq(bill_run_id.into_inner()))
            .order_by_asc(bills::Column::AccountNumber)
            .all(&self.db)
            .await?
            .into_iter()
            .map(bill_to_domain)
            .collect()
    }

    /// Loads a bill with its licences and their transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is invalid.
    pub async fn find_with_licences(
        &self,
        bill_id: BillId,
    ) -> Result<Option<BillWithLicences>, RepositoryError> {
        let Some(model) = bills::Entity::find_by_id(bill_id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut loaded = self.load_licences(vec![bill_to_domain(model)?]).await?;
        Ok(loaded.pop())
    }

    /// Bills flagged for rebilling that were sent in a bill run for `region_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is invalid.
    pub async fn find_flagged_for_rebilling(
        &self,
        region_id: RegionId,
    ) -> Result<Vec<BillWithLicences>, RepositoryError> {
        let flagged = bills::Entity::find()
            .join(sea_orm::JoinType::InnerJoin, bills::Relation::BillRuns.def())
            .filter(bills::Column::FlaggedForRebilling.eq(true))
            .filter(bill_runs::Column::RegionId.eq(region_id.into_inner()))
            .filter(bill_runs::Column::Status.eq(BillRunStatus::Sent.as_str()))
            .order_by_asc(bills::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(bill_to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        self.load_licences(flagged).await
    }

    /// Stores Charging Module invoice numbers against the bills of a bill run,
    /// matched by Charging Module invoice id.
    ///
    /// Returns the number of bills updated.
    ///
    /// # Errors
    ///
    /// Returns an error if an update fails; no numbers are stored in that case.
    pub async fn set_invoice_numbers(
        &self,
        bill_run_id: BillRunId,
        invoice_numbers: &[(Uuid, String)],
    ) -> Result<u64, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut updated = 0;

        for (external_id, invoice_number) in invoice_numbers {
            let result = bills::Entity::update_many()
                .col_expr(bills::Column::InvoiceNumber, Expr::value(invoice_number.clone()))
                .col_expr(bills::Column::UpdatedAt, Expr::current_timestamp().into())
                .filter(bills::Column::BillRunId.eq(bill_run_id.into_inner()))
                .filter(bills::Column::ExternalId.eq(*external_id))
                .exec(&txn)
                .await?;
            updated += result.rows_affected;
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Writes everything a reissue produced in one database transaction.
    ///
    /// Bill and bill licence IDs returned by the upserts replace the generated
    /// ones, so children always reference the stored parent row.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is stored in that case.
    pub async fn upsert_reissue(&self, output: &ReissueOutput) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        let mut bill_ids: HashMap<BillId, BillId> = HashMap::new();
        for bill in &output.bills {
            let stored = upsert_bill(&txn, bill).await?;
            bill_ids.insert(bill.id, stored.id);
        }

        let mut bill_licence_ids: HashMap<BillLicenceId, BillLicenceId> = HashMap::new();
        for bill_licence in &output.bill_licences {
            let bill_id = *bill_ids
                .get(&bill_licence.bill_id)
                .ok_or_else(|| RepositoryError::not_found("bill", bill_licence.bill_id))?;
            let stored = upsert_bill_licence(
                &txn,
                &BillLicence {
                    bill_id,
                    ..bill_licence.clone()
                },
            )
            .await?;
            bill_licence_ids.insert(bill_licence.id, stored.id);
        }

        for transaction in &output.transactions {
            let bill_licence_id = *bill_licence_ids
                .get(&transaction.bill_licence_id)
                .ok_or_else(|| {
                    RepositoryError::not_found("bill licence", transaction.bill_licence_id)
                })?;
            upsert_transaction(
                &txn,
                &Transaction {
                    bill_licence_id,
                    ..transaction.clone()
                },
            )
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn load_licences(&self, bills: Vec<Bill>) -> Result<Vec<BillWithLicences>, RepositoryError> {
        let bill_ids: Vec<Uuid> = bills.iter().map(|bill| bill.id.into_inner()).collect();

        let licences = bill_licences::Entity::find()
            .filter(bill_licences::Column::BillId.is_in(bill_ids))
            .order_by_asc(bill_licences::Column::LicenceRef)
            .all(&self.db)
            .await?;

        let licence_ids: Vec<Uuid> = licences.iter().map(|licence| licence.id).collect();
        let mut transactions_by_licence: HashMap<Uuid, Vec<Transaction>> = HashMap::new();
        for model in transactions::Entity::find()
            .filter(transactions::Column::BillLicenceId.is_in(licence_ids))
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?
        {
            transactions_by_licence
                .entry(model.bill_licence_id)
                .or_default()
                .push(transaction_to_domain(model)?);
        }

        let mut licences_by_bill: HashMap<Uuid, Vec<BillLicenceWithTransactions>> = HashMap::new();
        for model in licences {
            let transactions = transactions_by_licence.remove(&model.id).unwrap_or_default();
            licences_by_bill
                .entry(model.bill_id)
                .or_default()
                .push(BillLicenceWithTransactions {
                    bill_licence: bill_licence_to_domain(model),
                    transactions,
                });
        }

        Ok(bills
            .into_iter()
            .map(|bill| BillWithLicences {
                bill_licences: licences_by_bill
                    .remove(&bill.id.into_inner())
                    .unwrap_or_default(),
                bill,
            })
            .collect())
    }
}

/// Inserts a bill or merges it into the row with the same natural key.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn upsert_bill<C: ConnectionTrait>(db: &C, bill: &Bill) -> Result<Bill, RepositoryError> {
    let now = chrono::Utc::now().into();
    let model = bills::ActiveModel {
        id: Set(bill.id.into_inner()),
        bill_run_id: Set(bill.bill_run_id.into_inner()),
        billing_account_id: Set(bill.billing_account_id.into_inner()),
        account_number: Set(bill.account_number.clone()),
        external_id: Set(bill.external_id),
        invoice_number: Set(bill.invoice_number.clone()),
        financial_year_ending: Set(bill.financial_year_ending),
        net_amount: Set(bill.net_amount),
        is_credit: Set(bill.is_credit),
        flagged_for_rebilling: Set(bill.flagged_for_rebilling),
        rebilling_state: Set(bill.rebilling_state.map(|state| state.as_str().to_string())),
        original_bill_id: Set(bill.original_bill_id.map(BillId::into_inner)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let stored = bills::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                bills::Column::BillRunId,
                bills::Column::BillingAccountId,
                bills::Column::ExternalId,
            ])
            .update_columns([
                bills::Column::NetAmount,
                bills::Column::IsCredit,
                bills::Column::FlaggedForRebilling,
                bills::Column::RebillingState,
                bills::Column::OriginalBillId,
                bills::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    bill_to_domain(stored)
}

/// Inserts a bill licence or merges it into the row for the same bill and licence.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn upsert_bill_licence<C: ConnectionTrait>(
    db: &C,
    bill_licence: &BillLicence,
) -> Result<BillLicence, RepositoryError> {
    let now = chrono::Utc::now().into();
    let model = bill_licences::ActiveModel {
        id: Set(bill_licence.id.into_inner()),
        bill_id: Set(bill_licence.bill_id.into_inner()),
        licence_id: Set(bill_licence.licence_id.into_inner()),
        licence_ref: Set(bill_licence.licence_ref.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let stored = bill_licences::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([bill_licences::Column::BillId, bill_licences::Column::LicenceId])
                .update_columns([bill_licences::Column::LicenceRef, bill_licences::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?;

    Ok(bill_licence_to_domain(stored))
}

/// Inserts a transaction, or updates its Charging Module id if it already exists.
///
/// # Errors
///
/// Returns an error if the statement fails or a day count does not fit the column.
pub async fn upsert_transaction<C: ConnectionTrait>(
    db: &C,
    transaction: &Transaction,
) -> Result<(), RepositoryError> {
    let model = transaction_to_active(transaction)?;

    transactions::Entity::insert(model)
        .on_conflict(
            OnConflict::column(transactions::Column::Id)
                .update_columns([
                    transactions::Column::ExternalId,
                    transactions::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    Ok(())
}

pub(crate) fn bill_to_domain(model: bills::Model) -> Result<Bill, RepositoryError> {
    let rebilling_state = model
        .rebilling_state
        .as_deref()
        .map(|state| {
            RebillingState::parse(state)
                .ok_or_else(|| RepositoryError::invalid("bills.rebilling_state", state))
        })
        .transpose()?;

    Ok(Bill {
        id: BillId::from_uuid(model.id),
        bill_run_id: BillRunId::from_uuid(model.bill_run_id),
        billing_account_id: BillingAccountId::from_uuid(model.billing_account_id),
        account_number: model.account_number,
        external_id: model.external_id,
        invoice_number: model.invoice_number,
        financial_year_ending: model.financial_year_ending,
        net_amount: model.net_amount,
        is_credit: model.is_credit,
        flagged_for_rebilling: model.flagged_for_rebilling,
        rebilling_state,
        original_bill_id: model.original_bill_id.map(BillId::from_uuid),
    })
}

fn bill_licence_to_domain(model: bill_licences::Model) -> BillLicence {
    BillLicence {
        id: BillLicenceId::from_uuid(model.id),
        bill_id: BillId::from_uuid(model.bill_id),
        licence_id: LicenceId::from_uuid(model.licence_id),
        licence_ref: model.licence_ref,
    }
}

pub(crate) fn transaction_to_active(
    transaction: &Transaction,
) -> Result<transactions::ActiveModel, RepositoryError> {
    let line = &transaction.line;
    let now = chrono::Utc::now().into();
    let days = |field: &'static str, value: i64| {
        i32::try_from(value).map_err(|_| RepositoryError::invalid(field, value))
    };
    let purposes = serde_json::to_value(&line.purposes)
        .map_err(|err| RepositoryError::invalid("transactions.purposes", err))?;

    Ok(transactions::ActiveModel {
        id: Set(line.id.into_inner()),
        bill_licence_id: Set(transaction.bill_licence_id.into_inner()),
        charge_element_id: Set(line.charge_element_id.into_inner()),
        external_id: Set(line.external_id),
        net_amount: Set(transaction.net_amount),
        start_date: Set(line.start_date),
        end_date: Set(line.end_date),
        source: Set(line.source.clone()),
        season: Set(line.season.clone()),
        loss: Set(line.loss.clone()),
        is_credit: Set(line.is_credit),
        charge_type: Set(line.charge_type.as_str().to_string()),
        authorised_quantity: Set(line.authorised_quantity),
        billable_quantity: Set(line.billable_quantity),
        authorised_days: Set(days("transactions.authorised_days", line.authorised_days)?),
        billable_days: Set(days("transactions.billable_days", line.billable_days)?),
        status: Set(line.status.clone()),
        description: Set(line.description.clone()),
        volume: Set(line.volume),
        section_126_factor: Set(line.section_126_factor),
        section_127_agreement: Set(line.section_127_agreement),
        section_130_agreement: Set(line.section_130_agreement),
        second_part_charge: Set(line.second_part_charge),
        scheme: Set(line.scheme.clone()),
        aggregate_factor: Set(line.aggregate_factor),
        adjustment_factor: Set(line.adjustment_factor),
        charge_category_code: Set(line.charge_category_code.clone()),
        charge_category_description: Set(line.charge_category_description.clone()),
        is_winter_only: Set(line.is_winter_only),
        supported_source: Set(line.supported_source),
        supported_source_name: Set(line.supported_source_name.clone()),
        water_company_charge: Set(line.water_company_charge),
        water_undertaker: Set(line.water_undertaker),
        is_new_licence: Set(line.is_new_licence),
        purposes: Set(purposes),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

pub(crate) fn transaction_to_domain(model: transactions::Model) -> Result<Transaction, RepositoryError> {
    let charge_type = ChargeType::parse(&model.charge_type)
        .ok_or_else(|| RepositoryError::invalid("transactions.charge_type", &model.charge_type))?;
    let purposes = serde_json::from_value(model.purposes)
        .map_err(|err| RepositoryError::invalid("transactions.purposes", err))?;

    Ok(Transaction {
        bill_licence_id: BillLicenceId::from_uuid(model.bill_licence_id),
        net_amount: model.net_amount,
        line: TransactionLine {
            id: TransactionId::from_uuid(model.id),
            charge_element_id: ChargeElementId::from_uuid(model.charge_element_id),
            start_date: model.start_date,
            end_date: model.end_date,
            source: model.source,
            season: model.season,
            loss: model.loss,
            is_credit: model.is_credit,
            charge_type,
            authorised_quantity: model.authorised_quantity,
            billable_quantity: model.billable_quantity,
            authorised_days: i64::from(model.authorised_days),
            billable_days: i64::from(model.billable_days),
            status: model.status,
            description: model.description,
            volume: model.volume,
            section_126_factor: model.section_126_factor,
            section_127_agreement: model.section_127_agreement,
            section_130_agreement: model.section_130_agreement,
            second_part_charge: model.second_part_charge,
            scheme: model.scheme,
            aggregate_factor: model.aggregate_factor,
            adjustment_factor: model.adjustment_factor,
            charge_category_code: model.charge_category_code,
            charge_category_description: model.charge_category_description,
            is_winter_only: model.is_winter_only,
            supported_source: model.supported_source,
            supported_source_name: model.supported_source_name,
            water_company_charge: model.water_company_charge,
            water_undertaker: model.water_undertaker,
            is_new_licence: model.is_new_licence,
            purposes,
            external_id: model.external_id,
        },
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use sea_orm::ActiveValue;

    use super::*;

    fn bill_model(rebilling_state: Option<&str>) -> bills::Model {
        let now = Utc::now().into();
        bills::Model {
            id: Uuid::new_v4(),
            bill_run_id: Uuid::new_v4(),
            billing_account_id: Uuid::new_v4(),
            account_number: "A12345678A".to_string(),
            external_id: Some(Uuid::new_v4()),
            invoice_number: None,
            financial_year_ending: 2023,
            net_amount: -2_500,
            is_credit: true,
            flagged_for_rebilling: false,
            rebilling_state: rebilling_state.map(str::to_string),
            original_bill_id: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bill_to_domain() {
        let model = bill_model(Some("reversal"));
        let original = model.original_bill_id;
        let bill = bill_to_domain(model).unwrap();

        assert_eq!(bill.rebilling_state, Some(RebillingState::Reversal));
        assert_eq!(bill.net_amount, -2_500);
        assert_eq!(bill.original_bill_id.map(BillId::into_inner), original);
    }

    #[test]
    fn test_bill_to_domain_rejects_unknown_rebilling_state() {
        assert!(matches!(
            bill_to_domain(bill_model(Some("cancelled"))),
            Err(RepositoryError::InvalidValue { .. })
        ));
    }

    fn transaction(billable_days: i64) -> Transaction {
        Transaction {
            bill_licence_id: BillLicenceId::new(),
            net_amount: Some(-100),
            line: TransactionLine {
                id: TransactionId::new(),
                charge_element_id: ChargeElementId::new(),
                start_date: NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
                source: "non-tidal".to_string(),
                season: "all year".to_string(),
                loss: "low".to_string(),
                is_credit: true,
                charge_type: ChargeType::Compensation,
                authorised_quantity: Decimal::ONE,
                billable_quantity: Decimal::ONE,
                authorised_days: 365,
                billable_days,
                status: "candidate".to_string(),
                description: "Compensation charge".to_string(),
                volume: Decimal::ONE,
                section_126_factor: Decimal::ONE,
                section_127_agreement: false,
                section_130_agreement: false,
                second_part_charge: false,
                scheme: "sroc".to_string(),
                aggregate_factor: Decimal::ONE,
                adjustment_factor: Decimal::ONE,
                charge_category_code: "4.1.1".to_string(),
                charge_category_description: "Low loss".to_string(),
                is_winter_only: false,
                supported_source: false,
                supported_source_name: None,
                water_company_charge: false,
                water_undertaker: false,
                is_new_licence: false,
                purposes: vec![],
                external_id: Some(Uuid::new_v4()),
            },
        }
    }

    #[test]
    fn test_transaction_to_active() {
        let active = transaction_to_active(&transaction(183)).unwrap();
        assert_eq!(active.billable_days, ActiveValue::Set(183));
        assert_eq!(active.charge_type, ActiveValue::Set("compensation".to_string()));
        assert_eq!(active.net_amount, ActiveValue::Set(Some(-100)));
        assert_eq!(active.purposes, ActiveValue::Set(serde_json::json!([])));
    }

    #[test]
    fn test_transaction_days_must_fit_column() {
        assert!(matches!(
            transaction_to_active(&transaction(i64::from(i32::MAX) + 1)),
            Err(RepositoryError::InvalidValue {
                field: "transactions.billable_days",
                ..
            })
        ));
    }
}
