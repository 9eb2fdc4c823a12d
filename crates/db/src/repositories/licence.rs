//! Licence repository.

use riverbill_core::billing::LicenceDates;
use riverbill_shared::types::{BillRunId, LicenceId};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Statement};

use super::error::RepositoryError;
use crate::entities::licences;

/// Clears the supplementary billing flag on licences billed in a bill run,
/// unless the licence changed after the bill run was created.
const UNFLAG_BILLED_SQL: &str = r"
UPDATE licences l
SET include_in_sroc_billing = FALSE,
    updated_at = now()
FROM bill_licences bl
JOIN bills b ON b.id = bl.bill_id
JOIN bill_runs br ON br.id = b.bill_run_id
WHERE bl.licence_id = l.id
  AND br.id = $1
  AND l.include_in_sroc_billing
  AND l.updated_at <= br.created_at
";

/// Licence repository.
#[derive(Debug, Clone)]
pub struct LicenceRepository {
    db: DatabaseConnection,
}

impl LicenceRepository {
    /// Creates a new licence repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the lifecycle dates of a licence.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_dates(&self, id: LicenceId) -> Result<Option<LicenceDates>, RepositoryError> {
        Ok(licences::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .map(|licence| LicenceDates {
                start_date: licence.start_date,
                expired_date: licence.expired_date,
                lapsed_date: licence.lapsed_date,
                revoked_date: licence.revoked_date,
            }))
    }

    /// Clears `include_in_sroc_billing` on the licences billed in a bill run.
    ///
    /// Returns the number of licences unflagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn unflag_billed(&self, bill_run_id: BillRunId) -> Result<u64, RepositoryError> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                UNFLAG_BILLED_SQL,
                [bill_run_id.into_inner().into()],
            ))
            .await?;

        Ok(result.rows_affected())
    }
}
