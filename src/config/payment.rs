//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::paystack::{ProviderMode, PAYSTACK_BASE_URL};
use crate::application::PaymentSettings;
use crate::domain::payment::{Currency, StatusOverwritePolicy, DEFAULT_IDEMPOTENCY_TTL_SECS};

use super::error::ValidationError;

/// Longest accepted idempotency replay window (30 days).
pub const MAX_IDEMPOTENCY_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Payment configuration (Paystack)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Paystack secret key. Empty or the `sk_test_xxxxx` placeholder runs
    /// the service against the simulated provider.
    #[serde(default)]
    pub secret_key: String,

    /// Webhook signing secret; the secret key is used when unset
    #[serde(default)]
    pub webhook_secret: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Currency applied when a request omits one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Replay window for idempotency keys, in seconds
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_secs: u64,

    /// `last_writer_wins` or `terminal_final`
    #[serde(default)]
    pub status_overwrite: StatusOverwritePolicy,

    /// Timeout for a single provider call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
}

impl PaymentConfig {
    /// Provider mode selected by the configured keys.
    pub fn provider_mode(&self) -> ProviderMode {
        match ProviderMode::from_keys(&self.secret_key, self.webhook_secret.as_deref()) {
            ProviderMode::Live(config) => ProviderMode::Live(
                config
                    .with_base_url(self.api_base_url.as_str())
                    .with_timeout(Duration::from_secs(self.provider_timeout_secs)),
            ),
            simulated => simulated,
        }
    }

    /// Engine settings for the payment handlers.
    pub fn settings(&self) -> Result<PaymentSettings, ValidationError> {
        let default_currency =
            Currency::new(&self.default_currency).map_err(|_| ValidationError::InvalidCurrency)?;
        Ok(PaymentSettings {
            default_currency,
            idempotency_ttl_secs: self.idempotency_ttl_secs,
            overwrite_policy: self.status_overwrite,
        })
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.settings()?;
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidProviderUrl);
        }
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 300 {
            return Err(ValidationError::InvalidProviderTimeout);
        }
        if !(1..=MAX_IDEMPOTENCY_TTL_SECS).contains(&self.idempotency_ttl_secs) {
            return Err(ValidationError::InvalidIdempotencyTtl(
                MAX_IDEMPOTENCY_TTL_SECS,
            ));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: None,
            api_base_url: default_api_base_url(),
            default_currency: default_currency(),
            idempotency_ttl_secs: default_idempotency_ttl(),
            status_overwrite: StatusOverwritePolicy::default(),
            provider_timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    PAYSTACK_BASE_URL.to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_idempotency_ttl() -> u64 {
    DEFAULT_IDEMPOTENCY_TTL_SECS
}

fn default_provider_timeout() -> u64 {
    30
}
