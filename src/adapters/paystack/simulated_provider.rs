//! Offline Paystack simulation.
//!
//! Selected when no real secret key is configured. Answers with responses
//! shaped exactly like Paystack's, every charge succeeds, and every webhook
//! signature is accepted. No network access.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha512};
use tokio::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::Reference;
use crate::ports::{
    ChargeAuthorization, ChargeVerification, InitializeChargeRequest, PaymentProvider,
    ProviderError,
};

use super::wire::{parse_initialize, parse_verify};

/// Amount reported for references this instance never initialized.
const FALLBACK_AMOUNT: i64 = 500_000;

/// Number of initialized charges whose amounts are remembered.
pub const MAX_REMEMBERED_CHARGES: usize = 10_000;

const MOCK_CHECKOUT_URL: &str = "https://checkout.paystack.com";

/// Amounts of recent charges, oldest evicted first.
#[derive(Debug)]
struct RememberedCharges {
    amounts: HashMap<String, i64>,
    order: VecDeque<String>,
    capacity: usize,
}

impl RememberedCharges {
    fn remember(&mut self, reference: &str, amount: i64) {
        if self.amounts.insert(reference.to_string(), amount).is_none() {
            self.order.push_back(reference.to_string());
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.amounts.remove(&oldest);
            }
        }
    }
}

/// Deterministic stand-in for the Paystack API.
#[derive(Debug)]
pub struct SimulatedPaymentProvider {
    charges: Mutex<RememberedCharges>,
}

impl Default for SimulatedPaymentProvider {
    fn default() -> Self {
        Self::with_capacity(MAX_REMEMBERED_CHARGES)
    }
}

impl SimulatedPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation remembering the amounts of at most `capacity` charges.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            charges: Mutex::new(RememberedCharges {
                amounts: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Access code derived from the reference: 16 hex chars of SHA-512.
    fn access_code(reference: &Reference) -> String {
        let digest = Sha512::digest(reference.as_str().as_bytes());
        hex::encode(&digest[..8])
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn initialize(
        &self,
        request: InitializeChargeRequest,
    ) -> Result<ChargeAuthorization, ProviderError> {
        let access_code = Self::access_code(&request.reference);
        self.charges
            .lock()
            .await
            .remember(request.reference.as_str(), request.amount.minor_units());

        tracing::debug!(reference = %request.reference, "Simulated charge initialization");

        parse_initialize(json!({
            "status": true,
            "message": "Authorization URL created (MOCK MODE)",
            "data": {
                "authorization_url": format!("{}/mock_{}", MOCK_CHECKOUT_URL, access_code),
                "access_code": access_code,
                "reference": request.reference.as_str(),
            }
        }))
    }

    async fn verify(&self, reference: &Reference) -> Result<ChargeVerification, ProviderError> {
        let amount = self
            .charges
            .lock()
            .await
            .amounts
            .get(reference.as_str())
            .copied()
            .unwrap_or(FALLBACK_AMOUNT);
        let paid_at = Timestamp::now().as_datetime().to_rfc3339();

        tracing::debug!(reference = %reference, "Simulated charge verification");

        parse_verify(json!({
            "status": true,
            "message": "Verification successful (MOCK MODE)",
            "data": {
                "reference": reference.as_str(),
                "amount": amount,
                "currency": "NGN",
                "status": "success",
                "paid_at": paid_at,
                "customer": { "email": "mock@example.com" },
            }
        }))
    }

    fn check_signature(&self, _payload: &[u8], _signature: &str) -> bool {
        true
    }
}
