//! Paystack payment provider adapters.
//!
//! - `PaystackAdapter` - Live REST client
//! - `SimulatedPaymentProvider` - Offline simulation used when no real key is set
//! - `MockPaymentProvider` - Scriptable provider for tests
//!
//! Which one serves requests is decided once, at startup, by [`ProviderMode`].

mod mock_payment_provider;
mod paystack_adapter;
mod simulated_provider;
mod wire;

use std::sync::Arc;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use paystack_adapter::{PaystackAdapter, PaystackConfig, PAYSTACK_BASE_URL};
pub use simulated_provider::SimulatedPaymentProvider;

use crate::ports::{PaymentProvider, ProviderError};

/// Prefix of the placeholder key shipped in example environments.
const PLACEHOLDER_KEY_PREFIX: &str = "sk_test_xxxxx";

/// How the service talks to the payment provider.
#[derive(Debug, Clone)]
pub enum ProviderMode {
    /// No credentials: synthetic responses, all signatures accepted.
    Simulated,
    /// Real API calls.
    Live(PaystackConfig),
}

impl ProviderMode {
    /// Chooses the mode from the configured secret key.
    ///
    /// An empty key or the placeholder `sk_test_xxxxx...` selects simulation.
    /// The webhook secret falls back to the secret key when not set.
    pub fn from_keys(secret_key: &str, webhook_secret: Option<&str>) -> Self {
        let key = secret_key.trim();
        if key.is_empty() || key.starts_with(PLACEHOLDER_KEY_PREFIX) {
            return ProviderMode::Simulated;
        }

        let webhook_secret = webhook_secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(key);
        ProviderMode::Live(PaystackConfig::new(key, webhook_secret))
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, ProviderMode::Simulated)
    }

    /// Builds the provider for this mode.
    pub fn into_provider(self) -> Result<Arc<dyn PaymentProvider>, ProviderError> {
        match self {
            ProviderMode::Simulated => Ok(Arc::new(SimulatedPaymentProvider::new())),
            ProviderMode::Live(config) => Ok(Arc::new(PaystackAdapter::new(config)?)),
        }
    }
}
