//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bill_licence_id: Uuid,
    pub charge_element_id: Uuid,
    pub external_id: Option<Uuid>,
    pub net_amount: Option<i64>,
    pub start_date: Date,
    pub end_date: Date,
    pub source: String,
    pub season: String,
    pub loss: String,
    pub is_credit: bool,
    pub charge_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub authorised_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub billable_quantity: Decimal,
    pub authorised_days: i32,
    pub billable_days: i32,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub volume: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 6)))")]
    pub section_126_factor: Decimal,
    pub section_127_agreement: bool,
    pub section_130_agreement: bool,
    pub second_part_charge: bool,
    pub scheme: String,
    #[sea_orm(column_type = "Decimal(Some((10, 6)))")]
    pub aggregate_factor: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 6)))")]
    pub adjustment_factor: Decimal,
    pub charge_category_code: String,
    #[sea_orm(column_type = "Text")]
    pub charge_category_description: String,
    pub is_winter_only: bool,
    pub supported_source: bool,
    pub supported_source_name: Option<String>,
    pub water_company_charge: bool,
    pub water_undertaker: bool,
    pub is_new_licence: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub purposes: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bill_licences::Entity",
        from = "Column::BillLicenceId",
        to = "super::bill_licences::Column::Id"
    )]
    BillLicences,
}

impl Related<super::bill_licences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillLicences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
