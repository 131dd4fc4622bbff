//! Axum router configuration for payment endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    handle_webhook, initialize_payment, payment_history, verify_payment, PaymentAppState,
};

/// Caller-facing payment routes, relative to their mount point.
///
/// All of them require a bearer token:
/// - `POST /initialize` - Start a charge (optional `Idempotency-Key` header)
/// - `GET /verify/:reference` - Reconcile a charge with the provider
/// - `GET /history` - Paginated transaction history
pub fn user_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/verify/:reference", get(verify_payment))
        .route("/history", get(payment_history))
}

/// Provider-facing routes. No bearer auth; the signature is checked instead.
/// - `POST /webhook` - Provider event delivery
pub fn provider_routes() -> Router<PaymentAppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

/// All payment routes, with bearer-token authentication on the user routes only.
pub fn payment_router(state: PaymentAppState, auth: AuthState) -> Router {
    user_routes()
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
        .merge(provider_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::adapters::paystack::SimulatedPaymentProvider;
    use crate::application::PaymentSettings;
    use std::sync::Arc;

    fn test_state() -> PaymentAppState {
        let store = InMemoryPaymentStore::new();
        PaymentAppState {
            ledger: Arc::new(store.clone()),
            idempotency_store: Arc::new(store),
            provider: Arc::new(SimulatedPaymentProvider::new()),
            settings: PaymentSettings::default(),
        }
    }

    #[test]
    fn route_groups_create_routers() {
        let _: Router<()> = user_routes().with_state(test_state());
        let _: Router<()> = provider_routes().with_state(test_state());
    }

    #[test]
    fn payment_router_applies_auth() {
        let _: Router = payment_router(test_state(), Arc::new(MockSessionValidator::new()));
    }
}
