//! Orchestration errors.

use riverbill_charging::ChargingError;
use riverbill_core::bill_run::ReissueError;
use riverbill_core::billing::BillingError;
use riverbill_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors raised while driving bill runs through the Charging Module.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A Charging Module call did not succeed.
    #[error(
        "Charging Module {operation} failed for bill run {} bill {} ({}): {body}",
        .bill_run_external_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        .bill_external_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        .status_code.map_or_else(|| "no response".to_string(), |code| code.to_string())
    )]
    ExternalCallFailed {
        /// Operation that was attempted.
        operation: &'static str,
        /// Charging Module id of the bill run involved.
        bill_run_external_id: Option<Uuid>,
        /// Charging Module id of the invoice involved.
        bill_external_id: Option<Uuid>,
        /// HTTP status, when a response was received.
        status_code: Option<u16>,
        /// Raw response body or transport error.
        body: String,
    },

    /// The Charging Module bill run did not reach a wanted status in time.
    #[error(
        "Charging Module bill run {bill_run_external_id} still '{last_status}' after {attempts} status checks"
    )]
    PollTimeout {
        /// Charging Module id of the bill run.
        bill_run_external_id: Uuid,
        /// Number of status requests made.
        attempts: u32,
        /// Last status reported.
        last_status: String,
    },

    /// A successful Charging Module response could not be understood.
    #[error("Unexpected Charging Module {operation} response: {reason}")]
    UnexpectedPayload {
        /// Operation that was attempted.
        operation: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },

    /// A record the operation needs does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Billing arithmetic rejected its input.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// A reissue could not be mapped onto local records.
    #[error(transparent)]
    Reissue(#[from] ReissueError),
}

impl ServiceError {
    /// Tags a Charging Module error with the bill run and invoice it concerned.
    pub fn charging(
        err: ChargingError,
        bill_run_external_id: Option<Uuid>,
        bill_external_id: Option<Uuid>,
    ) -> Self {
        match err {
            ChargingError::RequestFailed {
                operation,
                status_code,
                body,
            } => Self::ExternalCallFailed {
                operation,
                bill_run_external_id,
                bill_external_id,
                status_code,
                body,
            },
            ChargingError::UnexpectedPayload { operation, reason } => {
                Self::UnexpectedPayload { operation, reason }
            }
            other @ (ChargingError::Client(_) | ChargingError::Token(_)) => {
                Self::ExternalCallFailed {
                    operation: "connect",
                    bill_run_external_id,
                    bill_external_id,
                    status_code: None,
                    body: other.to_string(),
                }
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExternalCallFailed { .. } => "EXTERNAL_CALL_FAILED",
            Self::PollTimeout { .. } => "POLL_TIMEOUT",
            Self::UnexpectedPayload { .. } => "UNEXPECTED_PAYLOAD",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Store(err) => err.error_code(),
            Self::Billing(err) => err.error_code(),
            Self::Reissue(err) => err.error_code(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => Self::NotFound(what),
            ServiceError::Store(err) => Self::Database(err.to_string()),
            ServiceError::Billing(err) => Self::BusinessRule(err.to_string()),
            ServiceError::Reissue(err) => Self::BusinessRule(err.to_string()),
            other @ (ServiceError::ExternalCallFailed { .. }
            | ServiceError::PollTimeout { .. }
            | ServiceError::UnexpectedPayload { .. }) => Self::ExternalService(other.to_string()),
        }
    }
}
