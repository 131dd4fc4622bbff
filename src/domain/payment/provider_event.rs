//! Inbound provider webhook events.
//!
//! Only the envelope matters here: the event name and `data.reference`.
//! Everything else is kept verbatim as the raw payload so it can be stored
//! on the transaction.

use serde_json::Value;

use super::Reference;

/// Event names the reconciliation engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventKind {
    ChargeSuccess,
    ChargeFailed,
    /// Any other event name, or none at all.
    Other(Option<String>),
}

impl ProviderEventKind {
    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("charge.success") => ProviderEventKind::ChargeSuccess,
            Some("charge.failed") => ProviderEventKind::ChargeFailed,
            other => ProviderEventKind::Other(other.map(str::to_string)),
        }
    }
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub kind: ProviderEventKind,
    /// Correlation key, absent for events not tied to a charge.
    pub reference: Option<Reference>,
    pub payload: Value,
}

impl ProviderEvent {
    /// Parses the raw request body.
    ///
    /// Fails only when the body is not a JSON object. A missing event name,
    /// missing `data` or unusable reference is not an error.
    pub fn parse(raw: &[u8]) -> Result<Self, String> {
        let payload: Value = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
        if !payload.is_object() {
            return Err("payload must be a JSON object".to_string());
        }

        let kind = ProviderEventKind::from_name(payload.get("event").and_then(Value::as_str));
        let reference = payload
            .get("data")
            .and_then(|data| data.get("reference"))
            .and_then(Value::as_str)
            .and_then(|r| Reference::new(r).ok());

        Ok(Self {
            kind,
            reference,
            payload,
        })
    }

    /// Event name for logging.
    pub fn name(&self) -> &str {
        match &self.kind {
            ProviderEventKind::ChargeSuccess => "charge.success",
            ProviderEventKind::ChargeFailed => "charge.failed",
            ProviderEventKind::Other(Some(name)) => name,
            ProviderEventKind::Other(None) => "<none>",
        }
    }
}
