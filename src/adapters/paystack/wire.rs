//! Paystack API wire types.
//!
//! Every Paystack response is wrapped in `{status, message, data}`. Only the
//! fields the ledger needs are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::{ChargeAuthorization, ChargeVerification, ProviderError};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// `data` of `POST /transaction/initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// `data` of `GET /transaction/verify/{reference}`.
///
/// Descriptive fields are kept as raw values: one of unexpected type is
/// dropped instead of failing the whole verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub currency: Value,
    #[serde(default)]
    pub paid_at: Value,
    #[serde(default)]
    pub customer: Value,
}

impl VerifyData {
    fn amount(&self) -> Option<i64> {
        match &self.amount {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn customer_email(&self) -> Option<String> {
        text(&self.customer["email"])
    }
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Body of `POST /transaction/initialize`. Paystack takes the amount as a string.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeBody<'a> {
    pub email: &'a str,
    pub amount: String,
    pub reference: &'a str,
}

/// Interprets a raw initialize response.
///
/// `status: false` or a missing `data` is a rejection even on HTTP 200.
pub fn parse_initialize(raw: Value) -> Result<ChargeAuthorization, ProviderError> {
    let envelope: PaystackEnvelope<InitializeData> = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::invalid_response(format!("Unexpected initialize body: {}", e)))?;

    if !envelope.status {
        return Err(ProviderError::rejected(envelope.message));
    }
    let data = envelope
        .data
        .ok_or_else(|| ProviderError::invalid_response("Initialize response has no data"))?;

    Ok(ChargeAuthorization {
        authorization_url: data.authorization_url,
        access_code: data.access_code,
        reference: data.reference,
        raw,
    })
}

/// Interprets a raw verify response.
pub fn parse_verify(raw: Value) -> Result<ChargeVerification, ProviderError> {
    let envelope: PaystackEnvelope<VerifyData> = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::invalid_response(format!("Unexpected verify body: {}", e)))?;

    if !envelope.status {
        return Err(ProviderError::rejected(envelope.message));
    }
    let data = envelope
        .data
        .ok_or_else(|| ProviderError::invalid_response("Verify response has no data"))?;

    Ok(ChargeVerification {
        status: text(&data.status).unwrap_or_default(),
        amount: data.amount(),
        currency: text(&data.currency),
        paid_at: text(&data.paid_at),
        customer_email: data.customer_email(),
        raw,
    })
}
