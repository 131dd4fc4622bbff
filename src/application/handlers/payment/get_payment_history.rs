//! GetPaymentHistoryHandler - Query handler for a user's transactions.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{PaymentError, Transaction};
use crate::ports::{PageRequest, TransactionLedger};

/// Query for one page of the caller's history.
#[derive(Debug, Clone)]
pub struct GetPaymentHistoryQuery {
    pub user_id: UserId,
    pub page: u32,
    pub limit: u32,
}

/// Page of transactions, newest first.
#[derive(Debug, Clone)]
pub struct GetPaymentHistoryResult {
    /// Total across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub transactions: Vec<Transaction>,
}

/// Handler for payment history.
pub struct GetPaymentHistoryHandler {
    ledger: Arc<dyn TransactionLedger>,
}

impl GetPaymentHistoryHandler {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: GetPaymentHistoryQuery,
    ) -> Result<GetPaymentHistoryResult, PaymentError> {
        let page = PageRequest::new(query.page, query.limit)?;
        let result = self.ledger.list_for_user(&query.user_id, page).await?;

        Ok(GetPaymentHistoryResult {
            total: result.total,
            page: page.page(),
            limit: page.limit(),
            transactions: result.items,
        })
    }
}
