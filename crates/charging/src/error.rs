//! Charging Module client errors.

use thiserror::Error;

/// Errors raised by the Charging Module client and poller.
#[derive(Debug, Error)]
pub enum ChargingError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build Charging Module client: {0}")]
    Client(String),

    /// No token could be obtained for the request.
    #[error("Failed to obtain Charging Module token: {0}")]
    Token(String),

    /// A request did not succeed.
    #[error("Charging Module {operation} request failed ({}): {body}", .status_code.map_or_else(|| "no response".to_string(), |code| code.to_string()))]
    RequestFailed {
        /// Operation that was attempted.
        operation: &'static str,
        /// HTTP status, when a response was received.
        status_code: Option<u16>,
        /// Raw response body or transport error message.
        body: String,
    },

    /// A successful response could not be understood.
    #[error("Unexpected Charging Module {operation} response: {reason}")]
    UnexpectedPayload {
        /// Operation that was attempted.
        operation: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl ChargingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Client(_) => "CHARGING_MODULE_CLIENT",
            Self::Token(_) => "CHARGING_MODULE_TOKEN",
            Self::RequestFailed { .. } => "CHARGING_MODULE_REQUEST_FAILED",
            Self::UnexpectedPayload { .. } => "CHARGING_MODULE_UNEXPECTED_PAYLOAD",
        }
    }
}
