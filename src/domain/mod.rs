//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, caller identity)
//! - `payment` - Transaction ledger, idempotency records and reconciliation rules

pub mod foundation;
pub mod payment;
