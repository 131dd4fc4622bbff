//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, error types and the authenticated
//! caller that form the vocabulary of the payment domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{TransactionId, UserId};
pub use timestamp::Timestamp;
