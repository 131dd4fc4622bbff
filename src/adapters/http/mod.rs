//! HTTP adapters - REST API implementations.
//!
//! `app_router` assembles the service: payment routes under
//! `/api/v1/payments`, the health probe at `/health`, and the cross-cutting
//! tower layers (tracing, request ids, CORS, timeout, compression).

pub mod health;
pub mod middleware;
pub mod payment;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use health::health_router;
pub use middleware::{auth_middleware, AuthState, RequireAuth};
pub use payment::{payment_router, PaymentApiError, PaymentAppState};

/// Mount point of the payment API.
pub const PAYMENT_API_PREFIX: &str = "/api/v1/payments";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Settings for the outer HTTP layers.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    /// Allowed origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("idempotency-key"),
            HeaderName::from_static("x-idempotency-key"),
        ]);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(parsed)
    }
}

/// Builds the complete application router.
pub fn app_router(state: PaymentAppState, auth: AuthState, options: &HttpOptions) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest(PAYMENT_API_PREFIX, payment_router(state.clone(), auth))
        .merge(health_router(state.ledger))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&options.cors_origins))
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
