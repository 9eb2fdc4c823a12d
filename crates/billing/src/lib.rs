//! Bill run orchestration for Riverbill.
//!
//! The services here sit between local storage and the Charging Module:
//! - [`BillRunLifecycleCoordinator`] sends a ready bill run
//! - [`ReissueOrchestrator`] reissues one sent bill
//! - [`ReissueBillRunService`] reissues every flagged bill into a bill run
//! - [`ChangeAddressService`] changes a billing account's address
//!
//! Long running work is spawned with [`spawn_detached`]; failures are
//! reported through a [`Notifier`].

pub mod customer;
pub mod error;
pub mod notifier;
pub mod reissue;
pub mod reissue_run;
pub mod send;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use customer::ChangeAddressService;
pub use error::ServiceError;
pub use notifier::{Notifier, TracingNotifier};
pub use reissue::ReissueOrchestrator;
pub use reissue_run::ReissueBillRunService;
pub use send::{BillRunLifecycleCoordinator, SENT_STATUSES};
pub use store::{BillingStore, DbBillingStore, StoreError};
pub use task::spawn_detached;
