//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured verification outcomes per reference
//! - Error injection
//! - Call tracking
//! - Signature acceptance or rejection

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::payment::Reference;
use crate::ports::{
    ChargeAuthorization, ChargeVerification, InitializeChargeRequest, PaymentProvider,
    ProviderError,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Configure a verification outcome
/// mock.set_verification_status("TXN_1", "failed");
///
/// // Inject errors
/// mock.set_method_error("verify", ProviderError::network("timeout"));
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Provider status string reported by `verify`, per reference.
    verification_status: HashMap<String, String>,

    /// Error to return on next call.
    next_error: Option<ProviderError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, ProviderError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Whether `check_signature` fails every signature.
    reject_signatures: bool,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all webhook signature checks.
    pub fn rejecting_signatures() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().reject_signatures = true;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the provider status `verify` reports for a reference.
    ///
    /// References without a configured status verify as `success`.
    pub fn set_verification_status(&self, reference: &str, status: &str) {
        self.inner
            .lock()
            .unwrap()
            .verification_status
            .insert(reference.to_string(), status.to_string());
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: ProviderError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: ProviderError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn initialize(
        &self,
        request: InitializeChargeRequest,
    ) -> Result<ChargeAuthorization, ProviderError> {
        self.record_call(
            "initialize",
            vec![
                request.email.clone(),
                request.amount.to_string(),
                request.reference.to_string(),
            ],
        );
        self.check_error("initialize")?;

        let access_code = format!("ac_{}", request.reference.as_str().to_lowercase());
        let authorization_url = format!("https://checkout.test/{}", access_code);

        Ok(ChargeAuthorization {
            raw: json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": authorization_url,
                    "access_code": access_code,
                    "reference": request.reference.as_str(),
                }
            }),
            authorization_url,
            access_code,
            reference: request.reference.to_string(),
        })
    }

    async fn verify(&self, reference: &Reference) -> Result<ChargeVerification, ProviderError> {
        self.record_call("verify", vec![reference.to_string()]);
        self.check_error("verify")?;

        let status = self
            .inner
            .lock()
            .unwrap()
            .verification_status
            .get(reference.as_str())
            .cloned()
            .unwrap_or_else(|| "success".to_string());

        Ok(ChargeVerification {
            raw: json!({
                "status": true,
                "message": "Verification successful",
                "data": {"reference": reference.as_str(), "status": status}
            }),
            status,
            amount: None,
            currency: None,
            paid_at: None,
            customer_email: None,
        })
    }

    fn check_signature(&self, payload: &[u8], signature: &str) -> bool {
        self.record_call(
            "check_signature",
            vec![payload.len().to_string(), signature.to_string()],
        );
        !self.inner.lock().unwrap().reject_signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;

    fn request() -> InitializeChargeRequest {
        InitializeChargeRequest {
            email: "payer@example.com".to_string(),
            amount: Amount::new(5000).unwrap(),
            reference: Reference::new("TXN_1_AAAAAAAA").unwrap(),
        }
    }

    #[tokio::test]
    async fn mock_records_calls() {
        let mock = MockPaymentProvider::new();

        mock.initialize(request()).await.unwrap();
        mock.verify(&Reference::new("TXN_1_AAAAAAAA").unwrap())
            .await
            .unwrap();

        assert_eq!(mock.call_count("initialize"), 1);
        assert_eq!(mock.call_count("verify"), 1);
        assert_eq!(mock.calls()[0].args[1], "5000");
    }

    #[tokio::test]
    async fn mock_method_error_persists_until_cleared() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("verify", ProviderError::network("timeout"));
        let reference = Reference::new("R").unwrap();

        assert!(mock.verify(&reference).await.is_err());
        assert!(mock.verify(&reference).await.is_err());

        mock.clear_errors();
        assert!(mock.verify(&reference).await.is_ok());
    }

    #[tokio::test]
    async fn mock_global_error_is_consumed() {
        let mock = MockPaymentProvider::new();
        mock.set_error(ProviderError::rejected("declined"));

        assert!(mock.initialize(request()).await.is_err());
        assert!(mock.initialize(request()).await.is_ok());
    }

    #[tokio::test]
    async fn mock_reports_configured_verification_status() {
        let mock = MockPaymentProvider::new();
        mock.set_verification_status("R", "abandoned");

        let verification = mock.verify(&Reference::new("R").unwrap()).await.unwrap();

        assert_eq!(verification.status, "abandoned");
    }

    #[test]
    fn rejecting_mock_fails_signatures() {
        assert!(!MockPaymentProvider::rejecting_signatures().check_signature(b"{}", "sig"));
        assert!(MockPaymentProvider::new().check_signature(b"{}", "sig"));
    }

    #[test]
    fn clones_share_state() {
        let mock = MockPaymentProvider::new();
        let clone = mock.clone();

        clone.check_signature(b"{}", "sig");

        assert_eq!(mock.call_count("check_signature"), 1);
    }
}
