//! IdempotencyStore port - responses remembered per (user, client key).
//!
//! Pure key-value semantics with expiry. Expiry is lazy: an expired record
//! stays in storage until replaced but is never returned by `get`.
//!
//! The engine writes records through `TransactionLedger::insert_initialized`
//! so they commit with the transaction they describe; `put` is the
//! standalone write for records with no ledger row attached.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::payment::{IdempotencyKey, IdempotencyRecord};

/// Result of attempting to save an idempotency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was stored (no live record existed for the pair).
    Inserted,
    /// A live record already exists for the pair; nothing was written.
    AlreadyExists,
}

/// Port for the idempotency store.
///
/// Implementations must back (user, key) with a uniqueness constraint so a
/// concurrent duplicate `put` is detected rather than silently doubled.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Return the live record for (user, key) as of `now`.
    async fn get(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: Timestamp,
    ) -> Result<Option<IdempotencyRecord>, DomainError>;

    /// Store a record unless a live one already exists for the pair.
    ///
    /// An expired record for the pair is replaced.
    async fn put(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError>;
}
