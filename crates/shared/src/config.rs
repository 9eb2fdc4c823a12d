//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Charging Module API configuration.
    pub charging_module: ChargingModuleConfig,
    /// Bill run processing configuration.
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Charging Module API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargingModuleConfig {
    /// Base URL of the Charging Module API, without trailing slash.
    pub base_url: String,
    /// Bearer token presented on every request.
    pub token: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Bill run processing configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BillingConfig {
    /// Pause between Charging Module status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of status polls before a send is abandoned.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    120
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("RIVERBILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_config_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.max_poll_attempts, 120);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("RIVERBILL__DATABASE__URL", Some("postgres://localhost/riverbill")),
                ("RIVERBILL__CHARGING_MODULE__BASE_URL", Some("http://cm.test")),
                ("RIVERBILL__CHARGING_MODULE__TOKEN", Some("secret")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/riverbill");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.charging_module.base_url, "http://cm.test");
                assert_eq!(config.charging_module.timeout_secs, 30);
                assert_eq!(config.billing.max_poll_attempts, 120);
            },
        );
    }

    #[test]
    fn test_load_fails_without_database_url() {
        temp_env::with_vars_unset(
            [
                "RIVERBILL__DATABASE__URL",
                "RIVERBILL__CHARGING_MODULE__BASE_URL",
                "RIVERBILL__CHARGING_MODULE__TOKEN",
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
