//! `SeaORM` Entity for billing_account_addresses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_account_addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub billing_account_id: Uuid,
    pub address_id: Uuid,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::billing_accounts::Entity",
        from = "Column::BillingAccountId",
        to = "super::billing_accounts::Column::Id"
    )]
    BillingAccounts,
}

impl Related<super::billing_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillingAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
