//! `SeaORM` Entity for bills table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bill_run_id: Uuid,
    pub billing_account_id: Uuid,
    pub account_number: String,
    pub external_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub financial_year_ending: i32,
    pub net_amount: i64,
    pub is_credit: bool,
    pub flagged_for_rebilling: bool,
    pub rebilling_state: Option<String>,
    pub original_bill_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bill_runs::Entity",
        from = "Column::BillRunId",
        to = "super::bill_runs::Column::Id"
    )]
    BillRuns,
}

impl Related<super::bill_runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillRuns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
