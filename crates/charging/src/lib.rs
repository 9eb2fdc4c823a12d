//! Charging Module API client for Riverbill.
//!
//! The Charging Module is the system of record for invoice numbering and
//! customer data export. This crate provides:
//! - The [`ChargingModule`] trait and its reqwest implementation
//! - A uniform [`RequestResult`] envelope for every request
//! - A [`TokenProvider`] seam for request credentials
//! - Status polling for bill runs

pub mod api;
pub mod client;
pub mod envelope;
pub mod error;
pub mod models;
pub mod token;
pub mod wait;

pub use api::ChargingModule;
pub use client::ChargingModuleClient;
pub use envelope::{ChargingModuleInfo, RequestResult, Response};
pub use error::ChargingError;
pub use token::{StaticToken, TokenProvider};
pub use wait::{PENDING_STATUS, PollOptions, WaitOutcome, wait_for_status, wait_while_pending};
