//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! - `PostgresTransactionLedger` - Transactions, row-locked status updates
//! - `PostgresIdempotencyStore` - Idempotency records with expiry

mod idempotency_store;
mod transaction_ledger;

pub use idempotency_store::PostgresIdempotencyStore;
pub use transaction_ledger::PostgresTransactionLedger;
