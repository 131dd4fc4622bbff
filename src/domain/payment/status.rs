//! Transaction status, provider status mapping and overwrite policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Ledger status of a payment attempt.
///
/// `Pending` is the only creation state; `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    /// Returns true for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }
}

/// Maps the provider's verification status string onto a ledger status.
///
/// Case-insensitive. `success` settles the charge, `failed` and `abandoned`
/// fail it; anything else (`ongoing`, `pending`, `reversed`, ...) carries no
/// status change and yields `None`.
pub fn map_provider_status(provider_status: &str) -> Option<TransactionStatus> {
    match provider_status.to_ascii_lowercase().as_str() {
        "success" => Some(TransactionStatus::Success),
        "failed" | "abandoned" => Some(TransactionStatus::Failed),
        _ => None,
    }
}

/// Whether a terminal status may be replaced by a later, different one.
///
/// Providers do not normally un-succeed a charge, but a late webhook or a
/// re-verification can still report a different outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOverwritePolicy {
    /// The most recent provider signal always wins.
    #[default]
    LastWriterWins,

    /// Once `Success` or `Failed`, the status never changes again.
    TerminalFinal,
}

impl StatusOverwritePolicy {
    /// Decides the status that results from applying `target` to `current`.
    pub fn resolve(&self, current: TransactionStatus, target: TransactionStatus) -> TransactionStatus {
        match self {
            StatusOverwritePolicy::LastWriterWins => target,
            StatusOverwritePolicy::TerminalFinal if current.is_terminal() => current,
            StatusOverwritePolicy::TerminalFinal => target,
        }
    }
}
