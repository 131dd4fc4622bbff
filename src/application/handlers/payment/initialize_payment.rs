//! InitializePaymentHandler - Command handler for starting a charge.
//!
//! With an idempotency key, a repeated request returns the stored response
//! of the first one and touches nothing. The stored record and the new
//! transaction are written in one unit by the ledger; the (user, key)
//! uniqueness constraint decides concurrent duplicates, and the loser
//! replays the winner's response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::payment::{
    Amount, Currency, IdempotencyKey, IdempotencyRecord, PaymentError, ProviderOperation,
    Reference, Transaction,
};
use crate::ports::{
    IdempotencyStore, InitializeChargeRequest, InsertOutcome, PaymentProvider, TransactionLedger,
};

use super::{upstream_error, PaymentSettings};

/// Command to initialize a charge.
#[derive(Debug, Clone)]
pub struct InitializePaymentCommand {
    pub user: AuthenticatedUser,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Defaults to the configured currency.
    pub currency: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Response returned to the client, and stored verbatim for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub status: String,
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
    pub amount: i64,
    pub currency: String,
}

/// Result of a successful initialization.
#[derive(Debug, Clone)]
pub struct InitializePaymentResult {
    pub authorization: PaymentAuthorization,
    /// True when served from a stored idempotency record.
    pub replayed: bool,
}

/// Handler for charge initialization.
pub struct InitializePaymentHandler {
    ledger: Arc<dyn TransactionLedger>,
    idempotency_store: Arc<dyn IdempotencyStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: PaymentSettings,
}

impl InitializePaymentHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        idempotency_store: Arc<dyn IdempotencyStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            ledger,
            idempotency_store,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitializePaymentCommand,
    ) -> Result<InitializePaymentResult, PaymentError> {
        // 1. Validate input before anything else
        let amount = Amount::new(cmd.amount)?;
        let currency = match cmd.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => self.settings.default_currency.clone(),
        };
        let key = cmd.idempotency_key.map(IdempotencyKey::new).transpose()?;
        let user_id = cmd.user.id.clone();

        // 2. Replay a live record for this key
        if let Some(key) = &key {
            if let Some(replay) = self.replay(&cmd.user, key).await? {
                tracing::info!(
                    user_id = %user_id,
                    idempotency_key = %key,
                    reference = %replay.reference,
                    "Replaying stored initialization response"
                );
                return Ok(InitializePaymentResult {
                    authorization: replay,
                    replayed: true,
                });
            }
        }

        // 3. Ask the provider for a charge; nothing is persisted on failure
        let now = Timestamp::now();
        let reference = Reference::generate(now);
        let charge = self
            .provider
            .initialize(InitializeChargeRequest {
                email: cmd.user.email.clone(),
                amount,
                reference: reference.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    reference = %reference,
                    user_id = %user_id,
                    error = %e,
                    "Provider initialization failed"
                );
                upstream_error(ProviderOperation::Initialize, &e)
            })?;

        let authorization = PaymentAuthorization {
            status: "success".to_string(),
            reference: reference.to_string(),
            authorization_url: charge.authorization_url,
            access_code: charge.access_code,
            amount: amount.minor_units(),
            currency: currency.to_string(),
        };

        // 4. Persist transaction and idempotency record together
        let transaction = Transaction::initialized(
            reference.clone(),
            user_id.clone(),
            amount,
            currency,
            charge.raw,
            now,
        );
        let record = match &key {
            Some(key) => Some(IdempotencyRecord::new(
                user_id.clone(),
                key.clone(),
                serde_json::to_value(&authorization).map_err(|e| {
                    PaymentError::infrastructure(format!("Failed to encode response: {}", e))
                })?,
                now,
                self.settings.idempotency_ttl_secs,
            )),
            None => None,
        };

        match self
            .ledger
            .insert_initialized(&transaction, record.as_ref())
            .await?
        {
            InsertOutcome::Inserted => {
                tracing::info!(
                    reference = %reference,
                    user_id = %user_id,
                    amount = transaction.amount.minor_units(),
                    currency = %transaction.currency,
                    "Payment initialized"
                );
                Ok(InitializePaymentResult {
                    authorization,
                    replayed: false,
                })
            }
            InsertOutcome::DuplicateIdempotencyKey => {
                // Lost the race: a concurrent request with the same key won.
                // The provider charge just created is left unreferenced.
                let Some(key) = key else {
                    return Err(PaymentError::infrastructure(
                        "Ledger reported a duplicate key for a request without one",
                    ));
                };
                match self.replay(&cmd.user, &key).await? {
                    Some(winner) => {
                        tracing::info!(
                            user_id = %user_id,
                            idempotency_key = %key,
                            discarded_reference = %reference,
                            reference = %winner.reference,
                            "Recovered idempotency key race"
                        );
                        Ok(InitializePaymentResult {
                            authorization: winner,
                            replayed: true,
                        })
                    }
                    None => {
                        tracing::warn!(
                            user_id = %user_id,
                            idempotency_key = %key,
                            "Duplicate idempotency key but no live record"
                        );
                        Err(PaymentError::idempotency_conflict(key.as_str()))
                    }
                }
            }
        }
    }

    async fn replay(
        &self,
        user: &AuthenticatedUser,
        key: &IdempotencyKey,
    ) -> Result<Option<PaymentAuthorization>, PaymentError> {
        let Some(record) = self
            .idempotency_store
            .get(&user.id, key, Timestamp::now())
            .await?
        else {
            return Ok(None);
        };

        serde_json::from_value(record.response)
            .map(Some)
            .map_err(|e| PaymentError::infrastructure(format!("Corrupt idempotency record: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::adapters::paystack::MockPaymentProvider;
    use crate::domain::foundation::{DomainError, Role, UserId};
    use crate::domain::payment::{AppliedUpdate, TransactionStatus, TransactionUpdate};
    use crate::ports::{PageRequest, ProviderError, TransactionPage};
    use async_trait::async_trait;

    fn payer(id: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(
            UserId::new(id).unwrap(),
            format!("{}@example.com", id),
            Role::User,
        )
    }

    fn command(user: &str, key: Option<&str>) -> InitializePaymentCommand {
        InitializePaymentCommand {
            user: payer(user),
            amount: 5000,
            currency: Some("NGN".to_string()),
            idempotency_key: key.map(str::to_string),
        }
    }

    fn setup(ttl_secs: u64) -> (InitializePaymentHandler, InMemoryPaymentStore, MockPaymentProvider) {
        let store = InMemoryPaymentStore::new();
        let provider = MockPaymentProvider::new();
        let handler = InitializePaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
            PaymentSettings {
                idempotency_ttl_secs: ttl_secs,
                ..PaymentSettings::default()
            },
        );
        (handler, store, provider)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    /// Ledger whose writes always fail.
    struct FailingLedger;

    #[async_trait]
    impl TransactionLedger for FailingLedger {
        async fn insert_initialized(
            &self,
            _transaction: &Transaction,
            _idempotency: Option<&IdempotencyRecord>,
        ) -> Result<InsertOutcome, DomainError> {
            Err(DomainError::database("Simulated insert failure"))
        }

        async fn find_by_reference(
            &self,
            _reference: &Reference,
        ) -> Result<Option<Transaction>, DomainError> {
            Ok(None)
        }

        async fn find_owned(
            &self,
            _reference: &Reference,
            _user_id: &UserId,
        ) -> Result<Option<Transaction>, DomainError> {
            Ok(None)
        }

        async fn apply_update(
            &self,
            _reference: &Reference,
            _update: &TransactionUpdate,
        ) -> Result<Option<(Transaction, AppliedUpdate)>, DomainError> {
            Ok(None)
        }

        async fn list_for_user(
            &self,
            _user_id: &UserId,
            _page: PageRequest,
        ) -> Result<TransactionPage, DomainError> {
            Ok(TransactionPage {
                total: 0,
                items: vec![],
            })
        }

        async fn delete_for_user(&self, _user_id: &UserId) -> Result<u64, DomainError> {
            Ok(0)
        }

        async fn ping(&self) -> Result<(), DomainError> {
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_transaction_with_provider_response() {
        let (handler, store, provider) = setup(3600);

        let result = handler.handle(command("user-1", None)).await.unwrap();

        assert!(!result.replayed);
        assert_eq!(result.authorization.status, "success");
        assert_eq!(result.authorization.amount, 5000);
        assert_eq!(result.authorization.currency, "NGN");
        assert!(result.authorization.reference.starts_with("TXN_"));
        assert_eq!(provider.call_count("initialize"), 1);

        let reference = Reference::new(result.authorization.reference).unwrap();
        let stored = store.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(stored.provider_response.unwrap()["status"], true);
    }

    #[tokio::test]
    async fn payer_email_is_forwarded_to_provider() {
        let (handler, _store, provider) = setup(3600);

        handler.handle(command("user-1", None)).await.unwrap();

        assert_eq!(provider.calls()[0].args[0], "user-1@example.com");
    }

    #[tokio::test]
    async fn missing_currency_uses_default() {
        let (handler, _store, _provider) = setup(3600);
        let mut cmd = command("user-1", None);
        cmd.currency = None;

        let result = handler.handle(cmd).await.unwrap();

        assert_eq!(result.authorization.currency, "NGN");
    }

    #[tokio::test]
    async fn calls_without_key_create_distinct_transactions() {
        let (handler, store, _provider) = setup(3600);

        let first = handler.handle(command("user-1", None)).await.unwrap();
        let second = handler.handle(command("user-1", None)).await.unwrap();

        assert_ne!(first.authorization.reference, second.authorization.reference);
        assert_eq!(store.transaction_count().await, 2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn same_key_replays_identical_response() {
        let (handler, store, provider) = setup(3600);

        let first = handler.handle(command("user-1", Some("abc"))).await.unwrap();
        let second = handler.handle(command("user-1", Some("abc"))).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(
            serde_json::to_vec(&first.authorization).unwrap(),
            serde_json::to_vec(&second.authorization).unwrap()
        );
        assert_eq!(store.transaction_count().await, 1);
        assert_eq!(provider.call_count("initialize"), 1);
    }

    #[tokio::test]
    async fn same_key_for_different_users_is_independent() {
        let (handler, store, _provider) = setup(3600);

        let first = handler.handle(command("user-1", Some("abc"))).await.unwrap();
        let second = handler.handle(command("user-2", Some("abc"))).await.unwrap();

        assert!(!second.replayed);
        assert_ne!(first.authorization.reference, second.authorization.reference);
        assert_eq!(store.transaction_count().await, 2);
    }

    #[tokio::test]
    async fn expired_key_behaves_as_unseen() {
        let (handler, store, provider) = setup(0);

        let first = handler.handle(command("user-1", Some("abc"))).await.unwrap();
        let second = handler.handle(command("user-1", Some("abc"))).await.unwrap();

        assert!(!second.replayed);
        assert_ne!(first.authorization.reference, second.authorization.reference);
        assert_eq!(provider.call_count("initialize"), 2);
        assert_eq!(store.transaction_count().await, 2);
        assert_eq!(store.idempotency_record_count().await, 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Paths
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn oversized_ttl_still_persists_the_charge() {
        let (handler, store, provider) = setup(u64::MAX / 2);

        let first = handler.handle(command("user-1", Some("abc"))).await.unwrap();
        let second = handler.handle(command("user-1", Some("abc"))).await.unwrap();

        assert_eq!(first.authorization, second.authorization);
        assert!(second.replayed);
        assert_eq!(provider.call_count("initialize"), 1);
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected_before_provider_call() {
        let (handler, _store, provider) = setup(3600);
        let mut cmd = command("user-1", None);
        cmd.amount = 0;

        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, PaymentError::ValidationFailed { ref field, .. } if field == "amount"));
        assert_eq!(provider.call_count("initialize"), 0);
    }

    #[tokio::test]
    async fn invalid_currency_is_rejected() {
        let (handler, _store, _provider) = setup(3600);
        let mut cmd = command("user-1", None);
        cmd.currency = Some("NAIRA".to_string());

        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, PaymentError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn provider_failure_persists_nothing() {
        let (handler, store, provider) = setup(3600);
        provider.set_error(ProviderError::rejected("Invalid key"));

        let err = handler.handle(command("user-1", Some("abc"))).await.unwrap_err();

        assert!(matches!(
            err,
            PaymentError::Upstream {
                operation: ProviderOperation::Initialize,
                ..
            }
        ));
        assert_eq!(store.transaction_count().await, 0);
        assert_eq!(store.idempotency_record_count().await, 0);
    }

    #[tokio::test]
    async fn key_can_be_reused_after_provider_failure() {
        let (handler, store, provider) = setup(3600);
        provider.set_error(ProviderError::network("timeout"));
        assert!(handler.handle(command("user-1", Some("abc"))).await.is_err());

        let retried = handler.handle(command("user-1", Some("abc"))).await.unwrap();

        assert!(!retried.replayed);
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn ledger_failure_surfaces_as_infrastructure_error() {
        let store = InMemoryPaymentStore::new();
        let handler = InitializePaymentHandler::new(
            Arc::new(FailingLedger),
            Arc::new(store),
            Arc::new(MockPaymentProvider::new()),
            PaymentSettings::default(),
        );

        let err = handler.handle(command("user-1", None)).await.unwrap_err();

        assert!(matches!(err, PaymentError::Infrastructure(_)));
    }

    #[tokio::test]
    async fn blank_idempotency_key_is_rejected() {
        let (handler, _store, _provider) = setup(3600);

        let err = handler.handle(command("user-1", Some("   "))).await.unwrap_err();

        assert!(matches!(err, PaymentError::ValidationFailed { .. }));
    }
}
