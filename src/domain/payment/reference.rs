//! Transaction reference: the correlation key shared with the provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{Timestamp, ValidationError};

const PREFIX: &str = "TXN";

/// Maximum stored length of a reference.
pub const MAX_REFERENCE_LEN: usize = 100;

/// Globally unique transaction reference.
///
/// Generated references look like `TXN_1705312200_9F3A0C7B`. References
/// received from outside (path segments, webhook payloads) are accepted in
/// any shape that fits storage; uniqueness is enforced by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Wraps an externally supplied reference.
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ValidationError::empty_field("reference"));
        }
        if reference.len() > MAX_REFERENCE_LEN {
            return Err(ValidationError::out_of_range(
                "reference",
                1,
                MAX_REFERENCE_LEN as i64,
                reference.len() as i64,
            ));
        }
        Ok(Self(reference))
    }

    /// Generates a fresh reference from the given instant and 32 random bits.
    pub fn generate(now: Timestamp) -> Self {
        let random = Uuid::new_v4();
        let suffix = hex::encode_upper(&random.as_bytes()[..4]);
        Self(format!("{}_{}_{}", PREFIX, now.as_unix_secs(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
