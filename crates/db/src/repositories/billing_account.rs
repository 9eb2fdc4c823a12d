//! Billing account repository: customer lookups and address changes.

use chrono::NaiveDate;
use riverbill_shared::types::{
    AddressId, BillingAccountAddressId, BillingAccountId, CompanyId, ContactId,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use super::error::RepositoryError;
use crate::entities::{
    addresses, billing_account_addresses, billing_accounts, companies, contacts, regions,
};

/// Data source recorded on rows created by this service.
const DATA_SOURCE: &str = "wrls";

/// Account holder details needed to describe a customer to the Charging Module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Billing account number, used as the Charging Module customer reference.
    pub account_number: String,
    /// Name of the account holder company.
    pub company_name: String,
    /// Charging Module region code.
    pub region_code: String,
}

/// Address to bill at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    /// First address line.
    pub address1: String,
    /// Second address line.
    pub address2: Option<String>,
    /// Third address line.
    pub address3: Option<String>,
    /// Fourth address line.
    pub address4: Option<String>,
    /// Town.
    pub address5: Option<String>,
    /// County.
    pub address6: Option<String>,
    /// Postcode.
    pub postcode: String,
    /// Country.
    pub country: Option<String>,
    /// Unique property reference number, when the address came from a lookup.
    pub uprn: Option<i64>,
}

/// Agent company that receives bills on the account holder's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInput {
    /// Company name.
    pub name: String,
    /// `person` or `organisation`.
    pub company_type: String,
    /// Organisation type, e.g. `limitedCompany`.
    pub organisation_type: Option<String>,
    /// Companies House number.
    pub company_number: Option<String>,
}

/// Contact for the billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    /// `person` or `department`.
    pub contact_type: String,
    /// Salutation.
    pub salutation: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Department name.
    pub department: Option<String>,
}

/// Input for changing where a billing account is billed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAddressInput {
    /// Account to change.
    pub billing_account_id: BillingAccountId,
    /// Date the new address applies from.
    pub start_date: NaiveDate,
    /// New address.
    pub address: AddressInput,
    /// Optional agent company.
    pub agent_company: Option<CompanyInput>,
    /// Optional contact.
    pub contact: Option<ContactInput>,
}

/// Rows written by an address change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedAddress {
    /// The billing account address row.
    pub billing_account_address_id: BillingAccountAddressId,
    /// The stored address.
    pub address_id: AddressId,
    /// The stored agent company, if any.
    pub company_id: Option<CompanyId>,
    /// The inserted contact, if any.
    pub contact_id: Option<ContactId>,
}

/// Billing account repository.
#[derive(Debug, Clone)]
pub struct BillingAccountRepository {
    db: DatabaseConnection,
}

impl BillingAccountRepository {
    /// Creates a new billing account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the customer details for a billing account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account, its company or its region is missing.
    pub async fn find_customer(
        &self,
        id: BillingAccountId,
    ) -> Result<CustomerDetails, RepositoryError> {
        let (account, company) = billing_accounts::Entity::find_by_id(id.into_inner())
            .find_also_related(companies::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("billing account", id))?;
        let company =
            company.ok_or_else(|| RepositoryError::not_found("company", account.company_id))?;
        let region = regions::Entity::find_by_id(account.region_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("region", account.region_id))?;

        Ok(CustomerDetails {
            account_number: account.account_number,
            company_name: company.name,
            region_code: region.charge_region_id,
        })
    }

    /// Replaces the current address of a billing account in one transaction.
    ///
    /// Open addresses that started before `start_date` are ended the day
    /// before it. Address and company rows merge on `uprn` and
    /// `company_number`; the billing account address merges on
    /// `(billing_account_id, start_date)`.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is stored in that case.
    pub async fn change_address(
        &self,
        input: &ChangeAddressInput,
    ) -> Result<ChangedAddress, RepositoryError> {
        let end_date = input
            .start_date
            .pred_opt()
            .ok_or_else(|| RepositoryError::invalid("start_date", input.start_date))?;

        let txn = self.db.begin().await?;

        billing_account_addresses::Entity::update_many()
            .col_expr(billing_account_addresses::Column::EndDate, Expr::value(end_date))
            .col_expr(
                billing_account_addresses::Column::UpdatedAt,
                Expr::current_timestamp().into(),
            )
            .filter(
                billing_account_addresses::Column::BillingAccountId
                    .eq(input.billing_account_id.into_inner()),
            )
            .filter(billing_account_addresses::Column::EndDate.is_null())
            .filter(billing_account_addresses::Column::StartDate.lt(input.start_date))
            .exec(&txn)
            .await?;

        let address_id = upsert_address(&txn, &input.address).await?;
        let company_id = match &input.agent_company {
            Some(company) => Some(upsert_company(&txn, company).await?),
            None => None,
        };
        let contact_id = match &input.contact {
            Some(contact) => Some(insert_contact(&txn, contact).await?),
            None => None,
        };

        let now = chrono::Utc::now().into();
        let stored = billing_account_addresses::Entity::insert(
            billing_account_addresses::ActiveModel {
                id: Set(BillingAccountAddressId::new().into_inner()),
                billing_account_id: Set(input.billing_account_id.into_inner()),
                address_id: Set(address_id.into_inner()),
                company_id: Set(company_id.map(CompanyId::into_inner)),
                contact_id: Set(contact_id.map(ContactId::into_inner)),
                start_date: Set(input.start_date),
                end_date: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .on_conflict(
            OnConflict::columns([
                billing_account_addresses::Column::BillingAccountId,
                billing_account_addresses::Column::StartDate,
            ])
            .update_columns([
                billing_account_addresses::Column::AddressId,
                billing_account_addresses::Column::CompanyId,
                billing_account_addresses::Column::ContactId,
                billing_account_addresses::Column::EndDate,
                billing_account_addresses::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_with_returning(&txn)
        .await?;

        txn.commit().await?;

        Ok(ChangedAddress {
            billing_account_address_id: BillingAccountAddressId::from_uuid(stored.id),
            address_id,
            company_id,
            contact_id,
        })
    }
}

async fn upsert_address(
    txn: &DatabaseTransaction,
    address: &AddressInput,
) -> Result<AddressId, RepositoryError> {
    let now = chrono::Utc::now().into();
    let stored = addresses::Entity::insert(addresses::ActiveModel {
        id: Set(AddressId::new().into_inner()),
        address1: Set(address.address1.clone()),
        address2: Set(address.address2.clone()),
        address3: Set(address.address3.clone()),
        address4: Set(address.address4.clone()),
        address5: Set(address.address5.clone()),
        address6: Set(address.address6.clone()),
        postcode: Set(address.postcode.clone()),
        country: Set(address.country.clone()),
        uprn: Set(address.uprn),
        data_source: Set(DATA_SOURCE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(addresses::Column::Uprn)
            .update_columns([
                addresses::Column::Address1,
                addresses::Column::Address2,
                addresses::Column::Address3,
                addresses::Column::Address4,
                addresses::Column::Address5,
                addresses::Column::Address6,
                addresses::Column::Postcode,
                addresses::Column::UpdatedAt,
            ])
            .to_owned(),
    )
    .exec_with_returning(txn)
    .await?;

    Ok(AddressId::from_uuid(stored.id))
}

async fn upsert_company(
    txn: &DatabaseTransaction,
    company: &CompanyInput,
) -> Result<CompanyId, RepositoryError> {
    let now = chrono::Utc::now().into();
    let stored = companies::Entity::insert(companies::ActiveModel {
        id: Set(CompanyId::new().into_inner()),
        name: Set(company.name.clone()),
        company_type: Set(company.company_type.clone()),
        organisation_type: Set(company.organisation_type.clone()),
        company_number: Set(company.company_number.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(companies::Column::CompanyNumber)
            .update_columns([
                companies::Column::Name,
                companies::Column::CompanyType,
                companies::Column::OrganisationType,
                companies::Column::UpdatedAt,
            ])
            .to_owned(),
    )
    .exec_with_returning(txn)
    .await?;

    Ok(CompanyId::from_uuid(stored.id))
}

async fn insert_contact(
    txn: &DatabaseTransaction,
    contact: &ContactInput,
) -> Result<ContactId, RepositoryError> {
    let now = chrono::Utc::now().into();
    let stored = contacts::ActiveModel {
        id: Set(ContactId::new().into_inner()),
        contact_type: Set(contact.contact_type.clone()),
        salutation: Set(contact.salutation.clone()),
        first_name: Set(contact.first_name.clone()),
        last_name: Set(contact.last_name.clone()),
        department: Set(contact.department.clone()),
        data_source: Set(DATA_SOURCE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await?;

    Ok(ContactId::from_uuid(stored.id))
}
