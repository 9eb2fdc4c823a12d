//! Uniform result envelope for Charging Module requests.
//!
//! Every request resolves to a [`RequestResult`], never an error. Callers
//! inspect `succeeded` and decide what a failure means for them.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ChargingError;

const GIT_COMMIT_HEADER: &str = "x-cma-git-commit";
const DOCKER_TAG_HEADER: &str = "x-cma-docker-tag";

/// Build details the Charging Module reports in response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargingModuleInfo {
    /// Git commit the Charging Module was built from.
    pub git_commit: Option<String>,
    /// Docker image tag the Charging Module runs as.
    pub docker_tag: Option<String>,
}

impl ChargingModuleInfo {
    pub(crate) fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Self {
            git_commit: header(GIT_COMMIT_HEADER),
            docker_tag: header(DOCKER_TAG_HEADER),
        }
    }
}

/// What came back from a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// An HTTP response, successful or not.
    Http {
        /// HTTP status code.
        status_code: u16,
        /// Parsed JSON body; a non-JSON body is kept as a string.
        body: Value,
        /// Build details from the response headers.
        info: ChargingModuleInfo,
    },
    /// No response: transport failure, timeout or missing token.
    Error(String),
}

/// Outcome of a Charging Module request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    /// True for a 2xx response.
    pub succeeded: bool,
    /// Response or transport error.
    pub response: Response,
}

impl RequestResult {
    /// A failed request that produced no HTTP response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            response: Response::Error(message.into()),
        }
    }

    /// A result built from an HTTP response; any 2xx or 3xx status succeeds.
    #[must_use]
    pub fn http(status_code: u16, body: Value, info: ChargingModuleInfo) -> Self {
        Self {
            succeeded: (200..400).contains(&status_code),
            response: Response::Http {
                status_code,
                body,
                info,
            },
        }
    }

    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status_code = response.status().as_u16();
        let info = ChargingModuleInfo::from_headers(response.headers());

        match response.text().await {
            Ok(text) => Self::http(status_code, parse_body(&text), info),
            Err(err) => Self::error(format!("failed to read response body: {err}")),
        }
    }

    /// HTTP status code, if a response was received.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match &self.response {
            Response::Http { status_code, .. } => Some(*status_code),
            Response::Error(_) => None,
        }
    }

    /// Response body, if a response was received.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match &self.response {
            Response::Http { body, .. } => Some(body),
            Response::Error(_) => None,
        }
    }

    /// Body or error message as text, for diagnostics.
    #[must_use]
    pub fn body_text(&self) -> String {
        match &self.response {
            Response::Http { body, .. } => match body {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            Response::Error(message) => message.clone(),
        }
    }

    /// Converts a failed result into `ChargingError::RequestFailed`.
    pub fn ensure_succeeded(self, operation: &'static str) -> Result<Self, ChargingError> {
        if self.succeeded {
            return Ok(self);
        }
        Err(ChargingError::RequestFailed {
            operation,
            status_code: self.status_code(),
            body: self.body_text(),
        })
    }

    /// Requires success, then deserializes the body.
    pub fn parse<T: DeserializeOwned>(self, operation: &'static str) -> Result<T, ChargingError> {
        let result = self.ensure_succeeded(operation)?;
        let body = result.body().cloned().unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|err| ChargingError::UnexpectedPayload {
            operation,
            reason: err.to_string(),
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
