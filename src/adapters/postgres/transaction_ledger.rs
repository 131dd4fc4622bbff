//! PostgreSQL implementation of TransactionLedger.
//!
//! Status changes take a row lock (`SELECT ... FOR UPDATE`) for the whole
//! read-apply-write, so concurrent verifications and webhooks for the same
//! reference serialise on that row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId, UserId};
use crate::domain::payment::{
    AppliedUpdate, Amount, Currency, IdempotencyRecord, Reference, Transaction,
    TransactionStatus, TransactionUpdate,
};
use crate::ports::{InsertOutcome, PageRequest, TransactionLedger, TransactionPage};

use super::idempotency_store::upsert_record;

const SELECT_COLUMNS: &str = "id, reference, user_id, amount, currency, status, \
     provider_response, created_at, verified_at";

/// PostgreSQL implementation of the TransactionLedger port.
pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    /// Creates a new ledger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    reference: String,
    user_id: String,
    amount: i64,
    currency: String,
    status: String,
    provider_response: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            reference: Reference::new(row.reference).map_err(|e| corrupt("reference", &e))?,
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", &e))?,
            amount: Amount::new(row.amount).map_err(|e| corrupt("amount", &e))?,
            currency: Currency::new(&row.currency).map_err(|e| corrupt("currency", &e))?,
            status: row
                .status
                .parse::<TransactionStatus>()
                .map_err(|e| corrupt("status", &e))?,
            provider_response: row.provider_response,
            created_at: Timestamp::from_datetime(row.created_at),
            verified_at: row.verified_at.map(Timestamp::from_datetime),
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn insert_initialized(
        &self,
        transaction: &Transaction,
        idempotency: Option<&IdempotencyRecord>,
    ) -> Result<InsertOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        if let Some(record) = idempotency {
            let written = upsert_record(&mut *tx, record)
                .await
                .map_err(|e| db_error("save idempotency record", e))?;
            if written == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| db_error("roll back transaction", e))?;
                return Ok(InsertOutcome::DuplicateIdempotencyKey);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, reference, user_id, amount, currency, status,
                provider_response, created_at, verified_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.reference.as_str())
        .bind(transaction.user_id.as_str())
        .bind(transaction.amount.minor_units())
        .bind(transaction.currency.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.provider_response)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.verified_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("transactions_reference_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateReference,
                        format!("Reference already exists: {}", transaction.reference),
                    );
                }
            }
            db_error("insert transaction", e)
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_reference(
        &self,
        reference: &Reference,
    ) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE reference = $1",
            SELECT_COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn find_owned(
        &self,
        reference: &Reference,
        user_id: &UserId,
    ) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE reference = $1 AND user_id = $2",
            SELECT_COLUMNS
        ))
        .bind(reference.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn apply_update(
        &self,
        reference: &Reference,
        update: &TransactionUpdate,
    ) -> Result<Option<(Transaction, AppliedUpdate)>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE reference = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock transaction", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back transaction", e))?;
            return Ok(None);
        };

        let mut transaction = Transaction::try_from(row)?;
        let applied = transaction.apply(update);

        sqlx::query(
            r#"
            UPDATE transactions SET
                status = $2,
                provider_response = $3,
                verified_at = $4
            WHERE id = $1
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.status.as_str())
        .bind(&transaction.provider_response)
        .bind(transaction.verified_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update transaction", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        Ok(Some((transaction, applied)))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<TransactionPage, DomainError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count transactions", e))?;

        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list transactions", e))?;

        let items = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransactionPage {
            total: total.max(0) as u64,
            items,
        })
    }

    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        sqlx::query("DELETE FROM idempotency_records WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("delete idempotency records", e))?;

        let result = sqlx::query("DELETE FROM transactions WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("delete transactions", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("reach database", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> TransactionRow {
        TransactionRow {
            id: Uuid::new_v4(),
            reference: "TXN_1705314600_9F3A0C7B".to_string(),
            user_id: "user-1".to_string(),
            amount: 500_000,
            currency: "NGN".to_string(),
            status: "pending".to_string(),
            provider_response: Some(json!({"status": true})),
            created_at: Utc::now(),
            verified_at: None,
        }
    }

    #[test]
    fn row_converts_to_transaction() {
        let txn = Transaction::try_from(row()).unwrap();

        assert_eq!(txn.reference.as_str(), "TXN_1705314600_9F3A0C7B");
        assert_eq!(txn.amount.minor_units(), 500_000);
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(txn.verified_at.is_none());
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "refunded".to_string();

        let err = Transaction::try_from(bad).unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("status"));
    }

    #[test]
    fn row_with_non_positive_amount_is_rejected() {
        let mut bad = row();
        bad.amount = 0;

        assert!(Transaction::try_from(bad).is_err());
    }

    #[test]
    fn status_strings_match_check_constraint() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Success,
            TransactionStatus::Failed,
        ] {
            let back: TransactionStatus = status.as_str().parse().unwrap();
            assert_eq!(back, status);
        }
    }
}
