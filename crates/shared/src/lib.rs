//! Shared types, errors, and configuration for Riverbill.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for bill runs, bills, licences and billing accounts
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, BillingConfig, ChargingModuleConfig, DatabaseConfig};
pub use error::{AppError, AppResult};
