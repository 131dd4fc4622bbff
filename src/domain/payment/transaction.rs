//! Transaction ledger entry and its reconciliation rules.
//!
//! A transaction is created once, by charge initialization, in `Pending`.
//! After that only two things ever touch it: a verification round-trip with
//! the provider and a provider webhook. Both are expressed as a
//! [`TransactionUpdate`] which the ledger applies under a row lock.

use serde_json::Value;

use crate::domain::foundation::{Timestamp, TransactionId, UserId};

use super::{Amount, Currency, Reference, StatusOverwritePolicy, TransactionStatus};

/// One payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub reference: Reference,
    pub user_id: UserId,
    pub amount: Amount,
    pub currency: Currency,
    pub status: TransactionStatus,
    /// Last raw payload received from the provider. Overwritten, not appended.
    pub provider_response: Option<Value>,
    pub created_at: Timestamp,
    pub verified_at: Option<Timestamp>,
}

impl Transaction {
    /// Creates a pending transaction for a charge the provider has accepted.
    pub fn initialized(
        reference: Reference,
        user_id: UserId,
        amount: Amount,
        currency: Currency,
        provider_response: Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            reference,
            user_id,
            amount,
            currency,
            status: TransactionStatus::Pending,
            provider_response: Some(provider_response),
            created_at,
            verified_at: None,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Applies a provider signal to this transaction.
    pub fn apply(&mut self, update: &TransactionUpdate) -> AppliedUpdate {
        let previous = self.status;
        let mut suppressed = false;

        if let Some(target) = update.status {
            let resolved = update.policy.resolve(previous, target);
            suppressed = resolved != target;
            self.status = resolved;
        }

        self.provider_response = Some(update.provider_response.clone());
        if let Some(at) = update.verified_at {
            self.verified_at = Some(at);
        }

        AppliedUpdate {
            previous,
            current: self.status,
            suppressed,
        }
    }
}

/// A provider-driven change to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// Status requested by the provider signal, if any.
    pub status: Option<TransactionStatus>,
    pub provider_response: Value,
    pub verified_at: Option<Timestamp>,
    pub policy: StatusOverwritePolicy,
}

impl TransactionUpdate {
    /// Outcome of asking the provider about a charge.
    ///
    /// Always records the response and the verification time, whether or
    /// not the status moved.
    pub fn verification(
        status: Option<TransactionStatus>,
        provider_response: Value,
        at: Timestamp,
        policy: StatusOverwritePolicy,
    ) -> Self {
        Self {
            status,
            provider_response,
            verified_at: Some(at),
            policy,
        }
    }

    /// `charge.success` webhook: settles the charge and stamps `verified_at`.
    pub fn charge_succeeded(payload: Value, at: Timestamp, policy: StatusOverwritePolicy) -> Self {
        Self {
            status: Some(TransactionStatus::Success),
            provider_response: payload,
            verified_at: Some(at),
            policy,
        }
    }

    /// `charge.failed` webhook: fails the charge, `verified_at` untouched.
    pub fn charge_failed(payload: Value, policy: StatusOverwritePolicy) -> Self {
        Self {
            status: Some(TransactionStatus::Failed),
            provider_response: payload,
            verified_at: None,
            policy,
        }
    }
}

/// What applying an update did to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub previous: TransactionStatus,
    pub current: TransactionStatus,
    /// The overwrite policy kept the previous terminal status.
    pub suppressed: bool,
}

impl AppliedUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}
