//! HandleProviderWebhookHandler - Command handler for provider push notifications.
//!
//! The signature is checked against the exact bytes received, before the
//! body is parsed. Only `charge.success` and `charge.failed` mutate the
//! ledger; every other authenticated delivery is acknowledged and dropped.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{
    PaymentError, ProviderEvent, ProviderEventKind, Reference, TransactionStatus,
    TransactionUpdate,
};
use crate::ports::{PaymentProvider, TransactionLedger};

use super::PaymentSettings;

/// Command carrying a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What the webhook did. Every variant is acknowledged to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleProviderWebhookResult {
    /// Event carried no usable reference.
    NoReference,
    /// Event type the ledger does not act on.
    Ignored { event: String },
    /// No transaction with this reference.
    UnknownReference { reference: String },
    /// Update applied (the status may have been kept by the overwrite policy).
    Applied {
        reference: String,
        status: TransactionStatus,
    },
}

/// Handler for provider webhooks.
pub struct HandleProviderWebhookHandler {
    ledger: Arc<dyn TransactionLedger>,
    provider: Arc<dyn PaymentProvider>,
    settings: PaymentSettings,
}

impl HandleProviderWebhookHandler {
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
        cmd: HandleProviderWebhookCommand,
    ) -> Result<HandleProviderWebhookResult, PaymentError> {
        if !self.provider.check_signature(&cmd.payload, &cmd.signature) {
            return Err(PaymentError::invalid_webhook_signature());
        }

        let event = ProviderEvent::parse(&cmd.payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed webhook payload");
            PaymentError::malformed_webhook(e)
        })?;

        let Some(reference) = event.reference.clone() else {
            tracing::info!(event = event.name(), "Webhook without reference ignored");
            return Ok(HandleProviderWebhookResult::NoReference);
        };

        let policy = self.settings.overwrite_policy;
        let update = match event.kind {
            ProviderEventKind::ChargeSuccess => {
                TransactionUpdate::charge_succeeded(event.payload, Timestamp::now(), policy)
            }
            ProviderEventKind::ChargeFailed => {
                TransactionUpdate::charge_failed(event.payload, policy)
            }
            ProviderEventKind::Other(_) => {
                tracing::debug!(
                    event = event.name(),
                    reference = %reference,
                    "Webhook event ignored"
                );
                return Ok(HandleProviderWebhookResult::Ignored {
                    event: event.name().to_string(),
                });
            }
        };

        self.apply(reference, update).await
    }

    async fn apply(
        &self,
        reference: Reference,
        update: TransactionUpdate,
    ) -> Result<HandleProviderWebhookResult, PaymentError> {
        match self.ledger.apply_update(&reference, &update).await? {
            None => {
                tracing::warn!(reference = %reference, "Webhook for unknown reference");
                Ok(HandleProviderWebhookResult::UnknownReference {
                    reference: reference.to_string(),
                })
            }
            Some((transaction, applied)) => {
                if applied.suppressed {
                    tracing::warn!(
                        reference = %reference,
                        current = %applied.current,
                        "Webhook status suppressed by overwrite policy"
                    );
                } else {
                    tracing::info!(
                        reference = %reference,
                        from = %applied.previous,
                        to = %applied.current,
                        "Transaction updated by webhook"
                    );
                }
                Ok(HandleProviderWebhookResult::Applied {
                    reference: reference.to_string(),
                    status: transaction.status,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::adapters::paystack::MockPaymentProvider;
    use crate::domain::foundation::UserId;
    use crate::domain::payment::{Amount, Currency, StatusOverwritePolicy, Transaction};
    use serde_json::json;

    async fn seed(store: &InMemoryPaymentStore, reference: &str) {
        let transaction = Transaction::initialized(
            Reference::new(reference).unwrap(),
            UserId::new("user-1").unwrap(),
            Amount::new(5000).unwrap(),
            Currency::new("NGN").unwrap(),
            json!({"status": true}),
            Timestamp::now(),
        );
        store.insert_initialized(&transaction, None).await.unwrap();
    }

    async fn stored(store: &InMemoryPaymentStore, reference: &str) -> Transaction {
        store
            .find_by_reference(&Reference::new(reference).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    fn handler(
        store: &InMemoryPaymentStore,
        provider: MockPaymentProvider,
        policy: StatusOverwritePolicy,
    ) -> HandleProviderWebhookHandler {
        HandleProviderWebhookHandler::new(
            Arc::new(store.clone()),
            Arc::new(provider),
            PaymentSettings {
                overwrite_policy: policy,
                ..PaymentSettings::default()
            },
        )
    }

    fn delivery(event: &str, reference: &str) -> HandleProviderWebhookCommand {
        let body = json!({"event": event, "data": {"reference": reference, "amount": 5000}});
        HandleProviderWebhookCommand {
            payload: serde_json::to_vec(&body).unwrap(),
            signature: "sig".to_string(),
        }
    }

    #[tokio::test]
    async fn charge_success_settles_and_stamps_verified_at() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;

        let result = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(delivery("charge.success", "TXN_1"))
            .await
            .unwrap();

        assert_eq!(
            result,
            HandleProviderWebhookResult::Applied {
                reference: "TXN_1".to_string(),
                status: TransactionStatus::Success,
            }
        );
        let transaction = stored(&store, "TXN_1").await;
        assert_eq!(transaction.status, TransactionStatus::Success);
        assert!(transaction.verified_at.is_some());
        assert_eq!(
            transaction.provider_response.unwrap()["event"],
            "charge.success"
        );
    }

    #[tokio::test]
    async fn charge_failed_does_not_stamp_verified_at() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;

        handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(delivery("charge.failed", "TXN_1"))
            .await
            .unwrap();

        let transaction = stored(&store, "TXN_1").await;
        assert_eq!(transaction.status, TransactionStatus::Failed);
        assert!(transaction.verified_at.is_none());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_parsing() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;
        let cmd = HandleProviderWebhookCommand {
            payload: b"not json".to_vec(),
            signature: "bad".to_string(),
        };

        let err = handler(
            &store,
            MockPaymentProvider::rejecting_signatures(),
            StatusOverwritePolicy::default(),
        )
        .handle(cmd)
        .await
        .unwrap_err();

        assert_eq!(err, PaymentError::InvalidWebhookSignature);
        assert_eq!(stored(&store, "TXN_1").await.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let store = InMemoryPaymentStore::new();
        let cmd = HandleProviderWebhookCommand {
            payload: b"{not json".to_vec(),
            signature: "sig".to_string(),
        };

        let err = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(cmd)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::MalformedWebhook(_)));
    }

    #[tokio::test]
    async fn other_events_do_not_mutate() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;
        let before = stored(&store, "TXN_1").await;

        let result = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(delivery("transfer.success", "TXN_1"))
            .await
            .unwrap();

        assert_eq!(
            result,
            HandleProviderWebhookResult::Ignored {
                event: "transfer.success".to_string()
            }
        );
        assert_eq!(stored(&store, "TXN_1").await, before);
    }

    #[tokio::test]
    async fn unknown_reference_is_acknowledged() {
        let store = InMemoryPaymentStore::new();

        let result = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(delivery("charge.success", "TXN_NOPE"))
            .await
            .unwrap();

        assert_eq!(
            result,
            HandleProviderWebhookResult::UnknownReference {
                reference: "TXN_NOPE".to_string()
            }
        );
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn missing_reference_is_acknowledged() {
        let store = InMemoryPaymentStore::new();
        let cmd = HandleProviderWebhookCommand {
            payload: br#"{"event":"charge.success","data":{}}"#.to_vec(),
            signature: "sig".to_string(),
        };

        let result = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default())
            .handle(cmd)
            .await
            .unwrap();

        assert_eq!(result, HandleProviderWebhookResult::NoReference);
    }

    #[tokio::test]
    async fn terminal_final_ignores_late_failure() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;
        let handler = handler(
            &store,
            MockPaymentProvider::new(),
            StatusOverwritePolicy::TerminalFinal,
        );

        handler.handle(delivery("charge.success", "TXN_1")).await.unwrap();
        let result = handler.handle(delivery("charge.failed", "TXN_1")).await.unwrap();

        assert_eq!(
            result,
            HandleProviderWebhookResult::Applied {
                reference: "TXN_1".to_string(),
                status: TransactionStatus::Success,
            }
        );
    }

    #[tokio::test]
    async fn redelivery_is_idempotent_in_effect() {
        let store = InMemoryPaymentStore::new();
        seed(&store, "TXN_1").await;
        let handler = handler(&store, MockPaymentProvider::new(), StatusOverwritePolicy::default());

        handler.handle(delivery("charge.success", "TXN_1")).await.unwrap();
        handler.handle(delivery("charge.success", "TXN_1")).await.unwrap();

        assert_eq!(stored(&store, "TXN_1").await.status, TransactionStatus::Success);
        assert_eq!(store.transaction_count().await, 1);
    }
}
