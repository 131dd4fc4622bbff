//! PayGate - payment gateway backend.
//!
//! Initializes charges with a payment provider, reconciles their outcome
//! through verification and provider webhooks, and keeps a per-user ledger
//! of transactions. Charge initialization is idempotent per user and
//! client-supplied key.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
