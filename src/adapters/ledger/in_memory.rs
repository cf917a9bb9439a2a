//! In-memory credit ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::ports::{CreditLedger, LedgerError};

/// Process-local balances. Users never written read as `default_credits`.
#[derive(Debug, Clone)]
pub struct InMemoryCreditLedger {
    balances: Arc<RwLock<HashMap<UserId, i64>>>,
    default_credits: i64,
}

impl InMemoryCreditLedger {
    pub fn new(default_credits: i64) -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            default_credits,
        }
    }

    /// Seeds a balance before the ledger is shared.
    pub async fn with_balance(self, user_id: UserId, balance: i64) -> Self {
        self.balances.write().await.insert(user_id, balance);
        self
    }
}

impl Default for InMemoryCreditLedger {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn balance(&self, user_id: &UserId) -> Result<i64, LedgerError> {
        Ok(self
            .balances
            .read()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(self.default_credits))
    }

    async fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<(), LedgerError> {
        self.balances.write().await.insert(user_id.clone(), balance);
        Ok(())
    }
}
