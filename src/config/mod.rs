//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PAYGATE` prefix and
//! nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use paygate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::{AuthConfig, MIN_PRODUCTION_SECRET_LEN};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, MAX_IDEMPOTENCY_TTL_SECS};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Where transactions and idempotency records live.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local storage, lost on restart. Development only.
    Memory,
}

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration, required for the postgres backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Session token verification
    pub auth: AuthConfig,

    /// Payment provider and reconciliation settings
    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub storage: StorageBackend,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `PAYGATE__*` variables:
    ///
    /// - `PAYGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYGATE__DATABASE__URL=...` -> `database.url = ...`
    /// - `PAYGATE__PAYMENT__SECRET_KEY=...` -> `payment.secret_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYGATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The database section is only checked for the postgres backend, and
    /// the memory backend is refused in production.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        match self.storage {
            StorageBackend::Postgres => self.database.validate()?,
            StorageBackend::Memory if self.is_production() => {
                return Err(ValidationError::MissingRequired("DATABASE__URL"));
            }
            StorageBackend::Memory => {}
        }
        self.auth.validate(&self.server.environment)?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
