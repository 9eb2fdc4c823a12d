//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod bill;
pub mod bill_run;
pub mod billing_account;
pub mod error;
pub mod licence;

pub use bill::{BillRepository, upsert_bill, upsert_bill_licence, upsert_transaction};
pub use bill_run::BillRunRepository;
pub use billing_account::{
    AddressInput, BillingAccountRepository, ChangeAddressInput, ChangedAddress, CompanyInput,
    ContactInput, CustomerDetails,
};
pub use error::RepositoryError;
pub use licence::LicenceRepository;
