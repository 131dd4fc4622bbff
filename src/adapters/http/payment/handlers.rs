//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the payment command/query handlers.
//! Commands that talk to the provider run on a spawned task: once a provider
//! call is under way, a client disconnect must not abort the ledger write
//! that follows it.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::{
    GetPaymentHistoryHandler, GetPaymentHistoryQuery, HandleProviderWebhookCommand,
    HandleProviderWebhookHandler, InitializePaymentCommand, InitializePaymentHandler,
    PaymentSettings, VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::domain::payment::PaymentError;
use crate::ports::{IdempotencyStore, PaymentProvider, TransactionLedger};

use super::dto::{
    ErrorResponse, HistoryParams, InitializePaymentRequest, PaymentHistoryResponse,
    VerifyPaymentResponse, WebhookAck,
};

/// Idempotency key headers, in order of preference.
pub const IDEMPOTENCY_KEY_HEADERS: [&str; 2] = ["idempotency-key", "x-idempotency-key"];

/// Header carrying the provider's HMAC-SHA512 webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for payment routes.
#[derive(Clone)]
pub struct PaymentAppState {
    pub ledger: Arc<dyn TransactionLedger>,
    pub idempotency_store: Arc<dyn IdempotencyStore>,
    pub provider: Arc<dyn PaymentProvider>,
    pub settings: PaymentSettings,
}

impl PaymentAppState {
    pub fn initialize_handler(&self) -> InitializePaymentHandler {
        InitializePaymentHandler::new(
            self.ledger.clone(),
            self.idempotency_store.clone(),
            self.provider.clone(),
            self.settings.clone(),
        )
    }

    pub fn verify_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.ledger.clone(),
            self.provider.clone(),
            self.settings.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleProviderWebhookHandler {
        HandleProviderWebhookHandler::new(
            self.ledger.clone(),
            self.provider.clone(),
            self.settings.clone(),
        )
    }

    pub fn history_handler(&self) -> GetPaymentHistoryHandler {
        GetPaymentHistoryHandler::new(self.ledger.clone())
    }
}

/// Runs `work` to completion on its own task, even if the caller goes away.
async fn run_detached<T, F>(work: F) -> Result<T, PaymentError>
where
    F: Future<Output = Result<T, PaymentError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| PaymentError::infrastructure(format!("Payment task aborted: {}", e)))?
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    IDEMPOTENCY_KEY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /initialize - Start a charge with the provider
pub async fn initialize_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = InitializePaymentCommand {
        user,
        amount: request.amount,
        currency: request.currency,
        idempotency_key: idempotency_key(&headers),
    };
    let handler = state.initialize_handler();

    let result = run_detached(async move { handler.handle(cmd).await }).await?;

    Ok(Json(result.authorization))
}

/// GET /verify/:reference - Reconcile one of the caller's charges
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = VerifyPaymentCommand { user, reference };
    let handler = state.verify_handler();

    let result = run_detached(async move { handler.handle(cmd).await }).await?;

    Ok(Json(VerifyPaymentResponse::from(result)))
}

/// POST /webhook - Provider push notification
///
/// Authenticated by signature over the raw body, never by bearer token.
pub async fn handle_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let cmd = HandleProviderWebhookCommand {
        payload: body.to_vec(),
        signature,
    };
    let handler = state.webhook_handler();

    run_detached(async move { handler.handle(cmd).await })
        .await
        .map_err(|e| {
            if matches!(e, PaymentError::InvalidWebhookSignature) {
                tracing::warn!("Webhook rejected: invalid signature");
            }
            e
        })?;

    Ok(Json(WebhookAck::received()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /history - Caller's transactions, newest first
pub async fn payment_history(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, PaymentApiError> {
    // Out-of-range values become 0 and fail validation.
    let page = u32::try_from(params.page.unwrap_or(1)).unwrap_or(0);
    let limit = u32::try_from(params.limit.unwrap_or(10)).unwrap_or(0);

    let result = state
        .history_handler()
        .handle(GetPaymentHistoryQuery {
            user_id: user.id,
            page,
            limit,
        })
        .await?;

    Ok(Json(PaymentHistoryResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(pub PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl PaymentApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            PaymentError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::Upstream { .. } => StatusCode::FAILED_DEPENDENCY,
            PaymentError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            PaymentError::MalformedWebhook(_) => StatusCode::BAD_REQUEST,
            PaymentError::IdempotencyConflict(_) => StatusCode::CONFLICT,
            PaymentError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if let PaymentError::Infrastructure(detail) = &self.0 {
            tracing::error!(error = %detail, "Payment request failed");
        }

        let code = self.0.code().to_string();
        let message = self.0.message();
        let body = match &self.0 {
            PaymentError::ValidationFailed { field, .. } => {
                ErrorResponse::with_details(code, message, serde_json::json!({ "field": field }))
            }
            PaymentError::Upstream { retryable, .. } => {
                ErrorResponse::with_details(code, message, serde_json::json!({ "retryable": retryable }))
            }
            _ => ErrorResponse::new(code, message),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::ProviderOperation;

    fn status_of(err: PaymentError) -> StatusCode {
        PaymentApiError::from(err).into_response().status()
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_of(PaymentError::validation("amount", "must be positive")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(PaymentError::not_found("TXN_1")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(PaymentError::upstream(ProviderOperation::Verify, "down", true)),
            StatusCode::FAILED_DEPENDENCY
        );
        assert_eq!(
            status_of(PaymentError::invalid_webhook_signature()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(PaymentError::malformed_webhook("eof")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PaymentError::idempotency_conflict("abc")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PaymentError::infrastructure("pool closed")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn infrastructure_detail_is_not_exposed() {
        let response = PaymentApiError::from(PaymentError::infrastructure("password=hunter2"))
            .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("Internal server error"));
    }

    #[test]
    fn idempotency_key_prefers_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-idempotency-key", "legacy".parse().unwrap());
        assert_eq!(idempotency_key(&headers).as_deref(), Some("legacy"));

        headers.insert("idempotency-key", "standard".parse().unwrap());
        assert_eq!(idempotency_key(&headers).as_deref(), Some("standard"));

        assert_eq!(idempotency_key(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn detached_work_reports_its_error() {
        let result: Result<(), PaymentError> =
            run_detached(async { Err(PaymentError::not_found("TXN_1")) }).await;
        assert_eq!(result, Err(PaymentError::not_found("TXN_1")));
    }
}
