//! `SeaORM` entity definitions.

pub mod addresses;
pub mod bill_licences;
pub mod bill_runs;
pub mod billing_account_addresses;
pub mod billing_accounts;
pub mod bills;
pub mod companies;
pub mod contacts;
pub mod licences;
pub mod regions;
pub mod transactions;
