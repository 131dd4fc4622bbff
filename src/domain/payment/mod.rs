//! Payment domain - the transaction ledger and its reconciliation rules.
//!
//! # Module Structure
//!
//! - `transaction` - Ledger entry and provider-driven updates
//! - `status` - Status enum, provider status mapping, overwrite policy
//! - `reference` - Correlation key shared with the provider
//! - `money` - Amount and currency value objects
//! - `idempotency` - Client keys and stored replay responses
//! - `provider_event` - Webhook envelope parsing
//! - `webhook_signature` - HMAC-SHA512 signature verification
//! - `errors` - Payment error taxonomy

mod errors;
mod idempotency;
mod money;
mod provider_event;
mod reference;
mod status;
mod transaction;
mod webhook_signature;

pub use errors::{PaymentError, ProviderOperation};
pub use idempotency::{
    IdempotencyKey, IdempotencyRecord, DEFAULT_IDEMPOTENCY_TTL_SECS, MAX_IDEMPOTENCY_KEY_LEN,
};
pub use money::{Amount, Currency};
pub use provider_event::{ProviderEvent, ProviderEventKind};
pub use reference::{Reference, MAX_REFERENCE_LEN};
pub use status::{map_provider_status, StatusOverwritePolicy, TransactionStatus};
pub use transaction::{AppliedUpdate, Transaction, TransactionUpdate};
pub use webhook_signature::{sign_payload, WebhookSignatureVerifier};
