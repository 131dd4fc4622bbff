//! VerifyPaymentHandler - Command handler for reconciling a charge with the provider.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::payment::{
    map_provider_status, PaymentError, ProviderOperation, Reference, TransactionUpdate,
};
use crate::ports::{PaymentProvider, TransactionLedger};

use super::{upstream_error, PaymentSettings};

/// Command to verify one of the caller's transactions.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user: AuthenticatedUser,
    pub reference: String,
}

/// Verification outcome as reported to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyPaymentResult {
    pub reference: String,
    /// Provider amount when reported, otherwise the stored one.
    pub amount: i64,
    pub currency: String,
    /// Provider status, lowercased. May be a value the ledger does not map.
    pub payment_status: String,
    pub paid_at: Option<Timestamp>,
    pub customer_email: String,
}

/// Handler for payment verification.
pub struct VerifyPaymentHandler {
    ledger: Arc<dyn TransactionLedger>,
    provider: Arc<dyn PaymentProvider>,
    settings: PaymentSettings,
}

impl VerifyPaymentHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        provider: Arc<dyn PaymentProvider>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            ledger,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, PaymentError> {
        let reference = Reference::new(cmd.reference)?;

        // 1. Ownership check; someone else's reference is indistinguishable from an unknown one
        let transaction = self
            .ledger
            .find_owned(&reference, &cmd.user.id)
            .await?
            .ok_or_else(|| PaymentError::not_found(reference.as_str()))?;

        // 2. Ask the provider; the transaction is untouched on failure
        let verification = self.provider.verify(&reference).await.map_err(|e| {
            tracing::error!(
                reference = %reference,
                error = %e,
                "Provider verification failed"
            );
            upstream_error(ProviderOperation::Verify, &e)
        })?;

        // 3. Apply under the row lock
        let target = map_provider_status(&verification.status);
        let update = TransactionUpdate::verification(
            target,
            verification.raw.clone(),
            Timestamp::now(),
            self.settings.overwrite_policy,
        );
        let Some((updated, applied)) = self.ledger.apply_update(&reference, &update).await? else {
            // Deleted between lookup and update
            return Err(PaymentError::not_found(reference.as_str()));
        };

        if applied.suppressed {
            tracing::warn!(
                reference = %reference,
                current = %applied.current,
                provider_status = %verification.status,
                "Verification status suppressed by overwrite policy"
            );
        } else if applied.changed() {
            tracing::info!(
                reference = %reference,
                from = %applied.previous,
                to = %applied.current,
                "Transaction status updated by verification"
            );
        }

        Ok(VerifyPaymentResult {
            reference: reference.to_string(),
            amount: verification
                .amount
                .unwrap_or_else(|| transaction.amount.minor_units()),
            currency: verification
                .currency
                .unwrap_or_else(|| updated.currency.to_string()),
            payment_status: verification.status.to_lowercase(),
            paid_at: verification
                .paid_at
                .as_deref()
                .and_then(Timestamp::parse_rfc3339),
            customer_email: cmd.user.email,
        })
    }
}
