//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the payment domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `TransactionLedger` - Durable transactions and atomic status updates
//! - `IdempotencyStore` - Responses remembered per (user, client key)
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Charge initialization, verification, webhook signatures
//! - `SessionValidator` - Bearer token validation

mod idempotency_store;
mod payment_provider;
mod session_validator;
mod transaction_ledger;

pub use idempotency_store::{IdempotencyStore, SaveResult};
pub use payment_provider::{
    ChargeAuthorization, ChargeVerification, InitializeChargeRequest, PaymentProvider,
    ProviderError, ProviderErrorCode,
};
pub use session_validator::SessionValidator;
pub use transaction_ledger::{
    InsertOutcome, PageRequest, TransactionLedger, TransactionPage, MAX_PAGE_LIMIT,
};
