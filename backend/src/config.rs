//! Configuration management for the Stockroom inventory backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCKROOM__ prefix

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Stock engine behaviour
    pub stock: StockConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret shared with the token issuer
    pub secret: String,

    /// Clock skew tolerated when checking `exp`, in seconds
    pub leeway_secs: u64,
}

/// What to do when a withdrawal asks for more than the lots hold
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShortfallPolicy {
    /// Take everything available, commit, and report the shortfall
    #[default]
    Commit,
    /// Write nothing and fail with `InsufficientStock`
    Reject,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockConfig {
    pub shortfall_policy: ShortfallPolicy,

    /// Upper bound for a whole stock transaction, in milliseconds
    pub transaction_timeout_ms: u64,
}

impl StockConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            shortfall_policy: ShortfallPolicy::Commit,
            transaction_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCKROOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("jwt.leeway_secs", 30)?
            .set_default("stock.shortfall_policy", "commit")?
            .set_default("stock.transaction_timeout_ms", 5_000)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCKROOM_ prefix)
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall_policy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: ShortfallPolicy,
        }

        let parsed: Wrapper = serde_json::from_str(r#"{"policy":"reject"}"#).unwrap();
        assert_eq!(parsed.policy, ShortfallPolicy::Reject);
        assert_eq!(ShortfallPolicy::default(), ShortfallPolicy::Commit);
    }

    #[test]
    fn test_stock_timeout_duration() {
        let stock = StockConfig {
            shortfall_policy: ShortfallPolicy::Commit,
            transaction_timeout_ms: 250,
        };
        assert_eq!(stock.transaction_timeout(), Duration::from_millis(250));
    }
}
