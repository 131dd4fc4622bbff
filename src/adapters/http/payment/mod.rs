//! HTTP adapter for payment endpoints.
//!
//! Mounted under `/api/v1/payments`:
//! - `POST /initialize` - Start a charge
//! - `GET /verify/:reference` - Verify a charge with the provider
//! - `POST /webhook` - Provider webhook (signature-authenticated)
//! - `GET /history` - Caller's payment history

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{PaymentApiError, PaymentAppState, IDEMPOTENCY_KEY_HEADERS, SIGNATURE_HEADER};
pub use routes::{payment_router, provider_routes, user_routes};
