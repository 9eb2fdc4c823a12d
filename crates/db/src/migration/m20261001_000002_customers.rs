//! Customer schema: billing accounts and the addresses, companies and
//! contacts they are billed at.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(CUSTOMERS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS billing_account_addresses, billing_accounts, contacts, companies, addresses CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const CUSTOMERS_SQL: &str = r"
CREATE TABLE addresses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    address1 VARCHAR(255) NOT NULL,
    address2 VARCHAR(255),
    address3 VARCHAR(255),
    address4 VARCHAR(255),
    address5 VARCHAR(255),
    address6 VARCHAR(255),
    postcode VARCHAR(20) NOT NULL,
    country VARCHAR(100),
    -- Unique property reference number from the address lookup service
    uprn BIGINT UNIQUE,
    data_source VARCHAR(20) NOT NULL DEFAULT 'wrls',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    company_type VARCHAR(20) NOT NULL DEFAULT 'organisation',
    organisation_type VARCHAR(30),
    company_number VARCHAR(20) UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE contacts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    contact_type VARCHAR(20) NOT NULL DEFAULT 'person',
    salutation VARCHAR(20),
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    department VARCHAR(255),
    data_source VARCHAR(20) NOT NULL DEFAULT 'wrls',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE billing_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id),
    region_id UUID NOT NULL REFERENCES regions(id),
    account_number VARCHAR(20) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE billing_account_addresses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    billing_account_id UUID NOT NULL REFERENCES billing_accounts(id) ON DELETE CASCADE,
    address_id UUID NOT NULL REFERENCES addresses(id),
    -- Agent company, when bills go to someone other than the account holder
    company_id UUID REFERENCES companies(id),
    contact_id UUID REFERENCES contacts(id),
    start_date DATE NOT NULL,
    end_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_billing_account_addresses_start UNIQUE (billing_account_id, start_date),
    CONSTRAINT chk_billing_account_addresses_dates CHECK (end_date IS NULL OR end_date >= start_date)
);

CREATE INDEX idx_billing_account_addresses_current
    ON billing_account_addresses(billing_account_id) WHERE end_date IS NULL;

ALTER TABLE bills
    ADD CONSTRAINT fk_bills_billing_account FOREIGN KEY (billing_account_id) REFERENCES billing_accounts(id);
";
