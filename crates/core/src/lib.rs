//! Core business logic for Riverbill.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, calendar arithmetic and reissue mapping rules live here.
//!
//! # Modules
//!
//! - `billing` - Abstraction periods, charge periods, billable days and transaction lines
//! - `bill_run` - Bill run, bill and transaction domain types plus reissue rules

pub mod bill_run;
pub mod billing;
