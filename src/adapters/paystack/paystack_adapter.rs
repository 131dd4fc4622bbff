//! Paystack payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Paystack REST API.
//!
//! # Security
//!
//! - Bearer authentication with the secret key, held as `secrecy::SecretString`
//! - Webhooks are authenticated with HMAC-SHA512 over the raw body,
//!   compared in constant time
//!
//! # Configuration
//!
//! ```ignore
//! let config = PaystackConfig::new(secret_key, webhook_secret);
//! let adapter = PaystackAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::payment::{Reference, WebhookSignatureVerifier};
use crate::ports::{
    ChargeAuthorization, ChargeVerification, InitializeChargeRequest, PaymentProvider,
    ProviderError, ProviderErrorCode,
};

use super::wire::{parse_initialize, parse_verify, InitializeBody};

/// Default Paystack API host.
pub const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Key the webhook HMAC is computed with. Paystack signs with the
    /// secret key, so this is usually the same value.
    webhook_secret: SecretString,

    /// Base URL for the API (default: https://api.paystack.co).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl PaystackConfig {
    /// Create a new Paystack configuration.
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: PAYSTACK_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Paystack payment provider adapter.
pub struct PaystackAdapter {
    config: PaystackConfig,
    verifier: WebhookSignatureVerifier,
    http_client: reqwest::Client,
}

impl PaystackAdapter {
    /// Create a new Paystack adapter with the given configuration.
    pub fn new(config: PaystackConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::network(format!("Failed to build HTTP client: {}", e)))?;
        let verifier = WebhookSignatureVerifier::new(config.webhook_secret.clone());

        Ok(Self {
            config,
            verifier,
            http_client,
        })
    }

    /// Reads the body of any response and classifies HTTP-level failures.
    ///
    /// Paystack returns its JSON envelope on errors too, so the message is
    /// taken from the body when there is one.
    async fn read_body(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<Value, ProviderError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::error!(
                operation,
                http_status = status.as_u16(),
                error = %message,
                "Paystack request failed"
            );

            let code = if status == reqwest::StatusCode::UNAUTHORIZED {
                ProviderErrorCode::AuthenticationError
            } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ProviderErrorCode::RateLimitExceeded
            } else if status.is_server_error() {
                ProviderErrorCode::ProviderUnavailable
            } else {
                ProviderErrorCode::Rejected
            };
            return Err(ProviderError::new(code, message).with_http_status(status.as_u16()));
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse Paystack response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for PaystackAdapter {
    async fn initialize(
        &self,
        request: InitializeChargeRequest,
    ) -> Result<ChargeAuthorization, ProviderError> {
        let url = format!("{}/transaction/initialize", self.config.api_base_url);
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount.minor_units().to_string(),
            reference: request.reference.as_str(),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;

        let raw = Self::read_body(response, "initialize").await?;
        parse_initialize(raw)
    }

    async fn verify(&self, reference: &Reference) -> Result<ChargeVerification, ProviderError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.config.api_base_url,
            reference.as_str()
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;

        let raw = Self::read_body(response, "verify").await?;
        parse_verify(raw)
    }

    fn check_signature(&self, payload: &[u8], signature: &str) -> bool {
        let valid = self.verifier.verify(payload, signature);
        if !valid {
            tracing::warn!(payload_len = payload.len(), "Invalid webhook signature");
        }
        valid
    }
}
