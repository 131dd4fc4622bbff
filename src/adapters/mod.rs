//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Transaction ledger and idempotency store on PostgreSQL
//! - `memory` - Process-local ledger and idempotency store
//! - `paystack` - Payment provider client, simulation and test mock
//! - `auth` - Session token validation
//! - `http` - REST API

pub mod auth;
pub mod http;
pub mod memory;
pub mod paystack;
pub mod postgres;
