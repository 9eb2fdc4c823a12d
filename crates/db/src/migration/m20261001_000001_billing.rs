//! Billing schema: regions, licences, bill runs, bills, bill licences and
//! transactions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BILLING_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS transactions, bill_licences, bills, bill_runs, licences, regions CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const BILLING_SQL: &str = r"
CREATE TABLE regions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    -- Region code the Charging Module knows the region by
    charge_region_id VARCHAR(1) NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE licences (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    licence_ref VARCHAR(50) NOT NULL UNIQUE,
    region_id UUID NOT NULL REFERENCES regions(id),
    start_date DATE NOT NULL,
    expired_date DATE,
    lapsed_date DATE,
    revoked_date DATE,
    -- Supplementary billing flag
    include_in_sroc_billing BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE bill_runs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    region_id UUID NOT NULL REFERENCES regions(id),
    external_id UUID UNIQUE,
    bill_run_number INTEGER,
    status VARCHAR(20) NOT NULL DEFAULT 'queued',
    batch_type VARCHAR(30) NOT NULL,
    from_financial_year_ending INTEGER NOT NULL,
    to_financial_year_ending INTEGER NOT NULL,
    transaction_file_reference VARCHAR(100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_bill_runs_status CHECK (status IN (
        'queued', 'processing', 'ready', 'review', 'sending', 'sent', 'empty', 'error', 'cancel'
    )),
    CONSTRAINT chk_bill_runs_batch_type CHECK (batch_type IN (
        'annual', 'supplementary', 'two_part_tariff', 'two_part_supplementary'
    )),
    CONSTRAINT chk_bill_runs_years CHECK (from_financial_year_ending <= to_financial_year_ending)
);

CREATE INDEX idx_bill_runs_region ON bill_runs(region_id, created_at DESC);

CREATE TABLE bills (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    bill_run_id UUID NOT NULL REFERENCES bill_runs(id) ON DELETE CASCADE,
    billing_account_id UUID NOT NULL,
    account_number VARCHAR(20) NOT NULL,
    external_id UUID,
    invoice_number VARCHAR(20),
    financial_year_ending INTEGER NOT NULL,
    -- Pence; credits are negative
    net_amount BIGINT NOT NULL DEFAULT 0,
    is_credit BOOLEAN NOT NULL DEFAULT false,
    flagged_for_rebilling BOOLEAN NOT NULL DEFAULT false,
    rebilling_state VARCHAR(10),
    original_bill_id UUID REFERENCES bills(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_bills_natural_key UNIQUE NULLS NOT DISTINCT (bill_run_id, billing_account_id, external_id),
    CONSTRAINT chk_bills_rebilling_state CHECK (
        rebilling_state IS NULL OR rebilling_state IN ('rebilled', 'reversal', 'rebill')
    )
);

CREATE INDEX idx_bills_flagged ON bills(billing_account_id) WHERE flagged_for_rebilling;
CREATE INDEX idx_bills_original ON bills(original_bill_id) WHERE original_bill_id IS NOT NULL;

CREATE TABLE bill_licences (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    bill_id UUID NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
    licence_id UUID NOT NULL REFERENCES licences(id),
    licence_ref VARCHAR(50) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_bill_licences_natural_key UNIQUE (bill_id, licence_id)
);

CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    bill_licence_id UUID NOT NULL REFERENCES bill_licences(id) ON DELETE CASCADE,
    charge_element_id UUID NOT NULL,
    external_id UUID UNIQUE,
    net_amount BIGINT,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    source VARCHAR(20) NOT NULL,
    season VARCHAR(20) NOT NULL,
    loss VARCHAR(20) NOT NULL,
    is_credit BOOLEAN NOT NULL DEFAULT false,
    charge_type VARCHAR(20) NOT NULL,
    authorised_quantity NUMERIC(19, 6) NOT NULL,
    billable_quantity NUMERIC(19, 6) NOT NULL,
    authorised_days INTEGER NOT NULL,
    billable_days INTEGER NOT NULL,
    status VARCHAR(20) NOT NULL,
    description TEXT NOT NULL,
    volume NUMERIC(19, 6) NOT NULL,
    section_126_factor NUMERIC(10, 6) NOT NULL DEFAULT 1,
    section_127_agreement BOOLEAN NOT NULL DEFAULT false,
    section_130_agreement BOOLEAN NOT NULL DEFAULT false,
    second_part_charge BOOLEAN NOT NULL DEFAULT false,
    scheme VARCHAR(10) NOT NULL,
    aggregate_factor NUMERIC(10, 6) NOT NULL DEFAULT 1,
    adjustment_factor NUMERIC(10, 6) NOT NULL DEFAULT 1,
    charge_category_code VARCHAR(20) NOT NULL,
    charge_category_description TEXT NOT NULL,
    is_winter_only BOOLEAN NOT NULL DEFAULT false,
    supported_source BOOLEAN NOT NULL DEFAULT false,
    supported_source_name VARCHAR(100),
    water_company_charge BOOLEAN NOT NULL DEFAULT false,
    water_undertaker BOOLEAN NOT NULL DEFAULT false,
    is_new_licence BOOLEAN NOT NULL DEFAULT false,
    -- Snapshot of the charge purposes the line was built from
    purposes JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_transactions_charge_type CHECK (charge_type IN ('standard', 'compensation')),
    CONSTRAINT chk_transactions_days CHECK (billable_days >= 0 AND authorised_days >= 0)
);

CREATE INDEX idx_transactions_bill_licence ON transactions(bill_licence_id);
";
