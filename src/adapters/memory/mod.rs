//! In-memory adapters for tests and local development.

mod payment_store;

pub use payment_store::InMemoryPaymentStore;
