//! GetCreditsHandler - Query handler for the caller's credit balance.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::generation::GenerationError;
use crate::ports::CreditLedger;

#[derive(Debug, Clone)]
pub struct GetCreditsQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCreditsResult {
    pub balance: i64,
}

pub struct GetCreditsHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl GetCreditsHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetCreditsQuery) -> Result<GetCreditsResult, GenerationError> {
        let balance = self
            .ledger
            .balance(&query.user_id)
            .await
            .map_err(|e| GenerationError::ledger_unavailable(e.to_string()))?;

        Ok(GetCreditsResult { balance })
    }
}
