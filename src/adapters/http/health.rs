//! Liveness and database health endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::domain::foundation::Timestamp;
use crate::ports::TransactionLedger;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: String,
}

/// GET /health
///
/// 200 with `healthy` when the ledger answers, 503 with `unhealthy` otherwise.
pub async fn health(State(ledger): State<Arc<dyn TransactionLedger>>) -> impl IntoResponse {
    let timestamp = Timestamp::now().as_datetime().to_rfc3339();
    match ledger.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "connected",
                timestamp,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                    timestamp,
                }),
            )
        }
    }
}

pub fn health_router(ledger: Arc<dyn TransactionLedger>) -> Router {
    Router::new().route("/health", get(health)).with_state(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use axum::body::Body;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthy_when_ledger_answers() {
        let app = health_router(Arc::new(InMemoryPaymentStore::new()));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
    }
}
