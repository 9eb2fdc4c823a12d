//! Bill run repository.

use riverbill_core::bill_run::{BatchType, BillRun, BillRunStatus};
use riverbill_shared::types::{BillRunId, RegionId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use super::error::RepositoryError;
use crate::entities::{bill_runs, regions};

/// Bill run repository.
#[derive(Debug, Clone)]
pub struct BillRunRepository {
    db: DatabaseConnection,
}

impl BillRunRepository {
    /// Creates a new bill run repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a bill run by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is invalid.
    pub async fn find_by_id(&self, id: BillRunId) -> Result<Option<BillRun>, RepositoryError> {
        bill_runs::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .map(to_domain)
            .transpose()
    }

    /// Inserts a bill run.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, bill_run: &BillRun) -> Result<BillRun, RepositoryError> {
        let now = chrono::Utc::now().into();
        let model = bill_runs::ActiveModel {
            id: Set(bill_run.id.into_inner()),
            region_id: Set(bill_run.region_id.into_inner()),
            external_id: Set(bill_run.external_id),
            bill_run_number: Set(bill_run.bill_run_number),
            status: Set(bill_run.status.as_str().to_string()),
            batch_type: Set(bill_run.batch_type.as_str().to_string()),
            from_financial_year_ending: Set(bill_run.from_financial_year_ending),
            to_financial_year_ending: Set(bill_run.to_financial_year_ending),
            transaction_file_reference: Set(bill_run.transaction_file_reference.clone()),
            created_at: Set(bill_run.created_at.into()),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        to_domain(model)
    }

    /// Sets a bill run's status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no bill run has this ID.
    pub async fn update_status(
        &self,
        id: BillRunId,
        status: BillRunStatus,
    ) -> Result<(), RepositoryError> {
        let result = bill_runs::Entity::update_many()
            .col_expr(bill_runs::Column::Status, Expr::value(status.as_str()))
            .col_expr(bill_runs::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(bill_runs::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("bill run", id));
        }
        Ok(())
    }

    /// Moves a bill run from `from` to `to` only if it is currently in `from`.
    ///
    /// Returns whether the status changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn transition_status(
        &self,
        id: BillRunId,
        from: BillRunStatus,
        to: BillRunStatus,
    ) -> Result<bool, RepositoryError> {
        let result = bill_runs::Entity::update_many()
            .col_expr(bill_runs::Column::Status, Expr::value(to.as_str()))
            .col_expr(bill_runs::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(bill_runs::Column::Id.eq(id.into_inner()))
            .filter(bill_runs::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Marks a bill run as sent and stores its transaction file reference.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no bill run has this ID.
    pub async fn mark_sent(
        &self,
        id: BillRunId,
        transaction_file_reference: Option<String>,
    ) -> Result<(), RepositoryError> {
        let result = bill_runs::Entity::update_many()
            .col_expr(
                bill_runs::Column::Status,
                Expr::value(BillRunStatus::Sent.as_str()),
            )
            .col_expr(
                bill_runs::Column::TransactionFileReference,
                Expr::value(transaction_file_reference),
            )
            .col_expr(bill_runs::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(bill_runs::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("bill run", id));
        }
        Ok(())
    }

    /// Returns the Charging Module code for a region.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the region does not exist.
    pub async fn region_code(&self, region_id: RegionId) -> Result<String, RepositoryError> {
        regions::Entity::find_by_id(region_id.into_inner())
            .one(&self.db)
            .await?
            .map(|region| region.charge_region_id)
            .ok_or_else(|| RepositoryError::not_found("region", region_id))
    }
}

pub(crate) fn to_domain(model: bill_runs::Model) -> Result<BillRun, RepositoryError> {
    Ok(BillRun {
        id: BillRunId::from_uuid(model.id),
        region_id: RegionId::from_uuid(model.region_id),
        external_id: model.external_id,
        bill_run_number: model.bill_run_number,
        status: BillRunStatus::parse(&model.status)
            .ok_or_else(|| RepositoryError::invalid("bill_runs.status", &model.status))?,
        batch_type: BatchType::parse(&model.batch_type)
            .ok_or_else(|| RepositoryError::invalid("bill_runs.batch_type", &model.batch_type))?,
        from_financial_year_ending: model.from_financial_year_ending,
        to_financial_year_ending: model.to_financial_year_ending,
        transaction_file_reference: model.transaction_file_reference,
        created_at: model.created_at.into(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn model(status: &str, batch_type: &str) -> bill_runs::Model {
        let now = Utc::now().into();
        bill_runs::Model {
            id: Uuid::new_v4(),
            region_id: Uuid::new_v4(),
            external_id: Some(Uuid::new_v4()),
            bill_run_number: Some(10_001),
            status: status.to_string(),
            batch_type: batch_type.to_string(),
            from_financial_year_ending: 2023,
            to_financial_year_ending: 2023,
            transaction_file_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_to_domain_maps_enums() {
        let bill_run = to_domain(model("ready", "supplementary")).unwrap();
        assert_eq!(bill_run.status, BillRunStatus::Ready);
        assert_eq!(bill_run.batch_type, BatchType::Supplementary);
    }

    #[test]
    fn test_to_domain_rejects_unknown_status() {
        assert!(matches!(
            to_domain(model("billed", "annual")),
            Err(RepositoryError::InvalidValue {
                field: "bill_runs.status",
                ..
            })
        ));
    }
}
