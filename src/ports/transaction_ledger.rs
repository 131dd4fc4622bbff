//! TransactionLedger port - durable store of payment transactions.
//!
//! The ledger is the single source of truth for payment state. All status
//! mutation is keyed by reference and goes through [`TransactionLedger::apply_update`],
//! which implementations must run as a read-lock-modify-write unit on that
//! one row so concurrent verifications and webhooks cannot lose an update.
//!
//! The ledger also owns the write side of idempotency: a new transaction and
//! the response stored against the caller's key are persisted together or
//! not at all.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId, ValidationError};
use crate::domain::payment::{
    AppliedUpdate, IdempotencyRecord, Reference, Transaction, TransactionUpdate,
};

/// Maximum page size for history queries.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Outcome of persisting an initialized charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Transaction (and idempotency record, if any) committed.
    Inserted,
    /// An unexpired record already exists for this (user, key); nothing was
    /// written.
    DuplicateIdempotencyKey,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::out_of_range("page", 1, u32::MAX as i64, page as i64));
        }
        if limit < 1 || limit > MAX_PAGE_LIMIT {
            return Err(ValidationError::out_of_range(
                "limit",
                1,
                MAX_PAGE_LIMIT as i64,
                limit as i64,
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of a user's transactions, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub total: u64,
    pub items: Vec<Transaction>,
}

/// Port for the transaction ledger.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Persist a freshly initialized transaction, together with the
    /// idempotency record for the request when one is given.
    ///
    /// Both rows commit atomically. An expired record for the same
    /// (user, key) is replaced; an unexpired one makes the whole call a
    /// no-op that reports [`InsertOutcome::DuplicateIdempotencyKey`].
    async fn insert_initialized(
        &self,
        transaction: &Transaction,
        idempotency: Option<&IdempotencyRecord>,
    ) -> Result<InsertOutcome, DomainError>;

    /// Look up by reference alone. Used by the webhook path.
    async fn find_by_reference(
        &self,
        reference: &Reference,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Look up by reference scoped to the owning user.
    async fn find_owned(
        &self,
        reference: &Reference,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Apply a provider signal under a row lock.
    ///
    /// Returns the stored transaction and what the update did to its status,
    /// or `None` if no transaction has this reference.
    async fn apply_update(
        &self,
        reference: &Reference,
        update: &TransactionUpdate,
    ) -> Result<Option<(Transaction, AppliedUpdate)>, DomainError>;

    /// The user's transactions, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<TransactionPage, DomainError>;

    /// Ownership-deletion rule: remove everything the user owns.
    ///
    /// Deletes the user's idempotency records and transactions in one unit
    /// and returns the number of transactions removed.
    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<(), DomainError>;
}
