//! Client idempotency keys and the responses stored against them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// Maximum stored length of a client key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Default replay window: 24 hours.
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 86_400;

/// Client-supplied key. Unique only together with the owning user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("idempotency_key"));
        }
        if trimmed.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(ValidationError::out_of_range(
                "idempotency_key",
                1,
                MAX_IDEMPOTENCY_KEY_LEN as i64,
                trimmed.len() as i64,
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response recorded for a (user, key) pair.
///
/// Never mutated. Once `expires_at` has passed the record is inert and a new
/// request with the same key proceeds as if none existed.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub user_id: UserId,
    pub key: IdempotencyKey,
    pub response: Value,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl IdempotencyRecord {
    pub fn new(
        user_id: UserId,
        key: IdempotencyKey,
        response: Value,
        created_at: Timestamp,
        ttl_secs: u64,
    ) -> Self {
        Self {
            user_id,
            key,
            response,
            created_at,
            expires_at: created_at.plus_secs(ttl_secs),
        }
    }

    /// A record is expired from `expires_at` onwards.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }
}
