//! PostgreSQL implementation of IdempotencyStore.
//!
//! Records live in `idempotency_records`, unique on (user_id, key). The
//! upsert below is shared with the ledger so a new transaction and its
//! record commit in the same database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::payment::{IdempotencyKey, IdempotencyRecord};
use crate::ports::{IdempotencyStore, SaveResult};

/// PostgreSQL implementation of the IdempotencyStore port.
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an idempotency record.
#[derive(Debug, sqlx::FromRow)]
struct IdempotencyRow {
    user_id: String,
    key: String,
    response: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<IdempotencyRow> for IdempotencyRecord {
    type Error = DomainError;

    fn try_from(row: IdempotencyRow) -> Result<Self, Self::Error> {
        Ok(IdempotencyRecord {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            key: IdempotencyKey::new(row.key).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid key: {}", e))
            })?,
            response: row.response,
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
        })
    }
}

/// Insert `record`, replacing an expired record for the same (user, key).
///
/// Returns the number of rows written: 0 means a live record already holds
/// the pair. Under concurrent inserts the unique index serialises the
/// writers, so exactly one of them sees 1.
pub(super) async fn upsert_record<'e, E>(
    executor: E,
    record: &IdempotencyRecord,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO idempotency_records (id, user_id, key, response, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, key) DO UPDATE SET
            id = EXCLUDED.id,
            response = EXCLUDED.response,
            created_at = EXCLUDED.created_at,
            expires_at = EXCLUDED.expires_at
        WHERE idempotency_records.expires_at <= EXCLUDED.created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record.user_id.as_str())
    .bind(record.key.as_str())
    .bind(&record.response)
    .bind(record.created_at.as_datetime())
    .bind(record.expires_at.as_datetime())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn get(
        &self,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: Timestamp,
    ) -> Result<Option<IdempotencyRecord>, DomainError> {
        let row: Option<IdempotencyRow> = sqlx::query_as(
            r#"
            SELECT user_id, key, response, created_at, expires_at
            FROM idempotency_records
            WHERE user_id = $1 AND key = $2 AND expires_at > $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(key.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch idempotency record: {}", e),
            )
        })?;

        row.map(IdempotencyRecord::try_from).transpose()
    }

    async fn put(&self, record: &IdempotencyRecord) -> Result<SaveResult, DomainError> {
        let written = upsert_record(&self.pool, record).await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save idempotency record: {}", e),
            )
        })?;

        if written == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}
