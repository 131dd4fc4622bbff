//! HTTP DTOs for payment endpoints.
//!
//! Request and response bodies for the payment API. The initialize response
//! is the application-level `PaymentAuthorization`, serialized as-is, so a
//! replayed response is byte-identical to the original.

use serde::{Deserialize, Serialize};

use crate::application::{GetPaymentHistoryResult, VerifyPaymentResult};
use crate::domain::payment::Transaction;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializePaymentRequest {
    /// Amount in the smallest currency unit (kobo for NGN).
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Query string of `GET /history`.
///
/// Signed so that negative values reach validation instead of failing
/// extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response of `GET /verify/{reference}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    pub customer_email: String,
}

impl From<VerifyPaymentResult> for VerifyPaymentResponse {
    fn from(result: VerifyPaymentResult) -> Self {
        Self {
            status: "success".to_string(),
            reference: result.reference,
            amount: result.amount,
            currency: result.currency,
            payment_status: result.payment_status,
            paid_at: result.paid_at.map(|t| t.as_datetime().to_rfc3339()),
            customer_email: result.customer_email,
        }
    }
}

/// One row of the history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: String,
    pub verified_at: Option<String>,
}

impl From<Transaction> for PaymentSummary {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id.to_string(),
            reference: t.reference.to_string(),
            amount: t.amount.minor_units(),
            currency: t.currency.to_string(),
            status: t.status.to_string(),
            created_at: t.created_at.as_datetime().to_rfc3339(),
            verified_at: t.verified_at.map(|v| v.as_datetime().to_rfc3339()),
        }
    }
}

/// Response of `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistoryResponse {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub payments: Vec<PaymentSummary>,
}

impl From<GetPaymentHistoryResult> for PaymentHistoryResponse {
    fn from(result: GetPaymentHistoryResult) -> Self {
        Self {
            total: result.total,
            page: result.page,
            limit: result.limit,
            payments: result
                .transactions
                .into_iter()
                .map(PaymentSummary::from)
                .collect(),
        }
    }
}

/// Acknowledgement returned for every accepted webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            status: "webhook received".to_string(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
