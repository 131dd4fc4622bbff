//! Payment provider port for external charge processing.
//!
//! Defines the contract for the third-party processor (Paystack today).
//! Implementations initialize charges, verify them, and authenticate
//! webhook deliveries.
//!
//! # Design
//!
//! - **Opaque provider**: Only the fields the ledger needs are typed; the
//!   full response is carried as `raw` and stored verbatim
//! - **Fail closed**: A response that does not positively confirm success
//!   is an error, never a partial result
//! - **Explicit mode**: Simulation vs. live is chosen when the adapter is
//!   constructed, not read from ambient state

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::payment::{Amount, Reference};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Start a charge for `email` and obtain the customer-facing
    /// authorization handle.
    async fn initialize(
        &self,
        request: InitializeChargeRequest,
    ) -> Result<ChargeAuthorization, ProviderError>;

    /// Ask the provider for the current state of a charge.
    async fn verify(&self, reference: &Reference) -> Result<ChargeVerification, ProviderError>;

    /// Check a webhook signature header against the raw body bytes.
    fn check_signature(&self, payload: &[u8], signature: &str) -> bool;
}

/// Request to initialize a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeChargeRequest {
    /// Payer email address.
    pub email: String,

    /// Amount in the smallest currency unit.
    pub amount: Amount,

    /// Our reference; the provider echoes it back on every event.
    pub reference: Reference,
}

/// Successful charge initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeAuthorization {
    /// URL the payer is redirected to.
    pub authorization_url: String,

    /// Provider access code for inline checkout.
    pub access_code: String,

    /// Reference as echoed by the provider.
    pub reference: String,

    /// Full provider response.
    pub raw: Value,
}

/// Answer to a verification request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeVerification {
    /// Provider status string (`success`, `failed`, `abandoned`, `ongoing`, ...).
    pub status: String,

    /// Amount as reported by the provider.
    pub amount: Option<i64>,

    /// Currency as reported by the provider.
    pub currency: Option<String>,

    /// Payment time exactly as sent; parsed leniently by the caller.
    pub paid_at: Option<String>,

    /// Customer email on the provider side.
    pub customer_email: Option<String>,

    /// Full provider response.
    pub raw: Value,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error code for categorization.
    pub code: ProviderErrorCode,

    /// Human-readable message.
    pub message: String,

    /// HTTP status returned by the provider, if any.
    pub http_status: Option<u16>,
}

impl ProviderError {
    /// Create a new provider error.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    /// Attach the HTTP status of the failed call.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Transport failure or timeout.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Credentials were refused.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationError, message)
    }

    /// The provider answered but did not confirm success.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Rejected, message)
    }

    /// The provider answered with something we cannot read.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider reported failure (`status: false` or a 4xx).
    Rejected,

    /// Provider-side outage (5xx).
    ProviderUnavailable,

    /// Response body could not be interpreted.
    InvalidResponse,
}

impl ProviderErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorCode::NetworkError
                | ProviderErrorCode::RateLimitExceeded
                | ProviderErrorCode::ProviderUnavailable
        )
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "network_error",
            ProviderErrorCode::AuthenticationError => "authentication_error",
            ProviderErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            ProviderErrorCode::Rejected => "rejected",
            ProviderErrorCode::ProviderUnavailable => "provider_unavailable",
            ProviderErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
