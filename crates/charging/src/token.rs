//! Credentials for Charging Module requests.

use async_trait::async_trait;

use crate::error::ChargingError;

/// Supplies the bearer token presented on each request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token valid for the next request.
    async fn token(&self) -> Result<String, ChargingError>;
}

/// A fixed token taken from configuration.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a configured token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, ChargingError> {
        if self.0.is_empty() {
            return Err(ChargingError::Token("no token configured".to_string()));
        }
        Ok(self.0.clone())
    }
}
