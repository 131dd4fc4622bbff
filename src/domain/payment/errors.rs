//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 422 |
//! | TransactionNotFound | 404 |
//! | Upstream | 424 |
//! | InvalidWebhookSignature | 401 |
//! | MalformedWebhook | 400 |
//! | IdempotencyConflict | 409 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Which provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOperation {
    Initialize,
    Verify,
}

impl ProviderOperation {
    fn describe(&self) -> &'static str {
        match self {
            ProviderOperation::Initialize => "Payment initialization failed",
            ProviderOperation::Verify => "Payment verification failed",
        }
    }
}

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Malformed caller input. No state change.
    ValidationFailed { field: String, message: String },

    /// Reference unknown, or not owned by the caller.
    TransactionNotFound(String),

    /// Provider call failed or returned a non-success answer.
    Upstream {
        operation: ProviderOperation,
        reason: String,
        retryable: bool,
    },

    /// Webhook signature did not match the body.
    InvalidWebhookSignature,

    /// Webhook body is not well-formed.
    MalformedWebhook(String),

    /// Duplicate idempotency key whose winning response could not be loaded.
    IdempotencyConflict(String),

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl PaymentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(reference: impl Into<String>) -> Self {
        PaymentError::TransactionNotFound(reference.into())
    }

    pub fn upstream(operation: ProviderOperation, reason: impl Into<String>, retryable: bool) -> Self {
        PaymentError::Upstream {
            operation,
            reason: reason.into(),
            retryable,
        }
    }

    pub fn invalid_webhook_signature() -> Self {
        PaymentError::InvalidWebhookSignature
    }

    pub fn malformed_webhook(reason: impl Into<String>) -> Self {
        PaymentError::MalformedWebhook(reason.into())
    }

    pub fn idempotency_conflict(key: impl Into<String>) -> Self {
        PaymentError::IdempotencyConflict(key.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            PaymentError::Upstream { .. } => ErrorCode::UpstreamFailed,
            PaymentError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            PaymentError::MalformedWebhook(_) => ErrorCode::MalformedWebhook,
            PaymentError::IdempotencyConflict(_) => ErrorCode::IdempotencyConflict,
            PaymentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            PaymentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentError::TransactionNotFound(_) => "Transaction not found".to_string(),
            PaymentError::Upstream {
                operation, reason, ..
            } => format!("{}: {}", operation.describe(), reason),
            PaymentError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            PaymentError::MalformedWebhook(_) => "Invalid JSON payload".to_string(),
            PaymentError::IdempotencyConflict(key) => {
                format!("A request with idempotency key '{}' is already in progress", key)
            }
            PaymentError::Infrastructure(_) => "Internal server error".to_string(),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Upstream { retryable, .. } => *retryable,
            PaymentError::IdempotencyConflict(_) | PaymentError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::Infrastructure(detail) => write!(f, "Infrastructure error: {}", detail),
            PaymentError::MalformedWebhook(detail) => write!(f, "Malformed webhook: {}", detail),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => PaymentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::TransactionNotFound => PaymentError::TransactionNotFound(err.message),
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_names_the_operation() {
        let err = PaymentError::upstream(ProviderOperation::Initialize, "connection refused", true);
        assert_eq!(
            err.message(),
            "Payment initialization failed: connection refused"
        );
        assert_eq!(err.code(), ErrorCode::UpstreamFailed);
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_message_does_not_echo_reference() {
        let err = PaymentError::not_found("TXN_SECRET");
        assert_eq!(err.message(), "Transaction not found");
    }

    #[test]
    fn infrastructure_message_hides_details_but_display_keeps_them() {
        let err = PaymentError::infrastructure("pool timed out");
        assert_eq!(err.message(), "Internal server error");
        assert!(err.to_string().contains("pool timed out"));
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: PaymentError = ValidationError::empty_field("currency").into();
        assert!(matches!(
            err,
            PaymentError::ValidationFailed { ref field, .. } if field == "currency"
        ));
    }

    #[test]
    fn domain_error_converts_by_code() {
        let not_found: PaymentError =
            DomainError::new(ErrorCode::TransactionNotFound, "TXN_1").into();
        let db: PaymentError = DomainError::database("boom").into();

        assert_eq!(not_found, PaymentError::TransactionNotFound("TXN_1".to_string()));
        assert!(matches!(db, PaymentError::Infrastructure(_)));
    }

    #[test]
    fn signature_and_validation_errors_are_not_retryable() {
        assert!(!PaymentError::invalid_webhook_signature().is_retryable());
        assert!(!PaymentError::validation("amount", "must be positive").is_retryable());
    }
}
