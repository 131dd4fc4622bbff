//! In-Memory Payment Store
//!
//! Implements both `TransactionLedger` and `IdempotencyStore` behind one
//! lock, so the atomicity the Postgres adapter gets from a database
//! transaction holds here too. Used by tests and by `storage.backend = memory`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::payment::{
    AppliedUpdate, IdempotencyKey, IdempotencyRecord, Reference, Transaction, TransactionUpdate,
};
use crate::ports::{
    IdempotencyStore, InsertOutcome, PageRequest, SaveResult, TransactionLedger, TransactionPage,
};

#[derive(Debug, Default)]
struct State {
    /// Transactions keyed by reference, tagged with insertion order.
    transactions: HashMap<Reference, (u64, Transaction)>,
    idempotency: HashMap<(UserId, IdempotencyKey), IdempotencyRecord>,
    next_seq: u64,
}

impl State {
    fn live_record(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: &Timestamp,
    ) -> Option<&IdempotencyRecord> {
        self.idempotency
            .get(&(user_id.clone(), key.clone()))
            .filter(|record| !record.is_expired(now))
    }
}

/// In-memory ledger and idempotency store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryPaymentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Number of stored idempotency records, expired ones included
    pub async fn idempotency_record_count(&self) -> usize {
        self.state.read().await.idempotency.len()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryPaymentStore {
    async fn insert_initialized(
        &self,
        transaction: &Transaction,
        idempotency: Option<&IdempotencyRecord>,
    ) -> Result<InsertOutcome, DomainError> {
        let mut state = self.state.write().await;

        if let Some(record) = idempotency {
            if state
                .live_record(&record.user_id, &record.key, &record.created_at)
                .is_some()
            {
                return Ok(InsertOutcome::DuplicateIdempotencyKey);
            }
        }

        if state.transactions.contains_key(&transaction.reference) {
            return Err(DomainError::new(
                ErrorCode::DuplicateReference,
                format!("Reference already exists: {}", transaction.reference),
            ));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .transactions
            .insert(transaction.reference.clone(), (seq, transaction.clone()));

        if let Some(record) = idempotency {
            state.idempotency.insert(
                (record.user_id.clone(), record.key.clone()),
                record.clone(),
            );
        }

        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_reference(
        &self,
        reference: &Reference,
    ) -> Result<Option<Transaction>, DomainError> {
        let state = self.state.read().await;
        Ok(state.transactions.get(reference).map(|(_, t)| t.clone()))
    }

    async fn find_owned(
        &self,
        reference: &Reference,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .get(reference)
            .map(|(_, t)| t)
            .filter(|t| t.is_owned_by(user_id))
            .cloned())
    }

    async fn apply_update(
        &self,
        reference: &Reference,
        update: &TransactionUpdate,
    ) -> Result<Option<(Transaction, AppliedUpdate)>, DomainError> {
        let mut state = self.state.write().await;
        Ok(state.transactions.get_mut(reference).map(|(_, transaction)| {
            let applied = transaction.apply(update);
            (transaction.clone(), applied)
        }))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<TransactionPage, DomainError> {
        let state = self.state.read().await;

        let mut owned: Vec<&(u64, Transaction)> = state
            .transactions
            .values()
            .filter(|(_, t)| t.is_owned_by(user_id))
            .collect();
        owned.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .as_datetime()
                .cmp(a.created_at.as_datetime())
                .then(seq_b.cmp(seq_a))
        });

        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|(_, t)| t.clone())
            .collect();

        Ok(TransactionPage { total, items })
    }

    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;

        state.idempotency.retain(|(owner, _), _| owner != user_id);

        let before = state.transactions.len();
        state.transactions.retain(|_, (_, t)| !t.is_owned_by(user_id));
        Ok((before - state.transactions.len()) as u64)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryPaymentStore {
    async fn get(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: Timestamp,
    ) -> Result<Option<IdempotencyRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state.live_record(user_id, key, &now).cloned())
    }

    async fn put(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        if state
            .live_record(&record.user_id, &record.key, &record.created_at)
            .is_some()
        {
            return Ok(SaveResult::AlreadyExists);
        }
        state.idempotency.insert(
            (record.user_id.clone(), record.key.clone()),
            record.clone(),
        );
        Ok(SaveResult::Inserted)
    }
}
