//! Payment handlers - the reconciliation engine.
//!
//! ## Commands
//! - Initializing a charge (idempotent per user and client key)
//! - Verifying a charge with the provider
//! - Applying provider webhooks
//!
//! ## Queries
//! - Paginated payment history

mod get_payment_history;
mod handle_provider_webhook;
mod initialize_payment;
mod verify_payment;

use crate::domain::payment::{
    Currency, PaymentError, ProviderOperation, StatusOverwritePolicy,
    DEFAULT_IDEMPOTENCY_TTL_SECS,
};
use crate::ports::ProviderError;

// Commands
pub use handle_provider_webhook::{
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, HandleProviderWebhookResult,
};
pub use initialize_payment::{
    InitializePaymentCommand, InitializePaymentHandler, InitializePaymentResult,
    PaymentAuthorization,
};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use get_payment_history::{
    GetPaymentHistoryHandler, GetPaymentHistoryQuery, GetPaymentHistoryResult,
};

/// Engine settings shared by the payment handlers.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Currency used when a request does not name one.
    pub default_currency: Currency,

    /// Replay window for idempotency records.
    pub idempotency_ttl_secs: u64,

    /// What happens when a provider signal targets a terminal transaction.
    pub overwrite_policy: StatusOverwritePolicy,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            default_currency: Currency::default(),
            idempotency_ttl_secs: DEFAULT_IDEMPOTENCY_TTL_SECS,
            overwrite_policy: StatusOverwritePolicy::default(),
        }
    }
}

fn upstream_error(operation: ProviderOperation, err: &ProviderError) -> PaymentError {
    PaymentError::upstream(operation, err.message.clone(), err.is_retryable())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_provider_defaults() {
        let settings = PaymentSettings::default();

        assert_eq!(settings.default_currency.as_str(), "NGN");
        assert_eq!(settings.idempotency_ttl_secs, 86_400);
        assert_eq!(settings.overwrite_policy, StatusOverwritePolicy::LastWriterWins);
    }

    #[test]
    fn upstream_error_keeps_retryability() {
        let err = upstream_error(ProviderOperation::Verify, &ProviderError::network("timeout"));

        assert!(err.is_retryable());
        assert_eq!(err.message(), "Payment verification failed: timeout");
    }
}
