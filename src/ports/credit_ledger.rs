//! Credit ledger port.
//!
//! Balances live in the identity provider's per-user profile metadata. The
//! store offers no compare-and-swap, so the contract is a plain read and a
//! plain overwrite. Callers that need read-modify-write atomicity must
//! serialize access themselves.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger store unreachable: {0}")]
    Unavailable(String),

    #[error("ledger store rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected ledger response: {0}")]
    MalformedResponse(String),
}

/// Reads and overwrites per-user credit balances.
///
/// # Contract
///
/// - `balance` returns the stored integer, treating a missing value as zero
/// - `set_balance` overwrites unconditionally with the given value
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance for the user.
    async fn balance(&self, user_id: &UserId) -> Result<i64, LedgerError>;

    /// Overwrites the user's balance.
    async fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<(), LedgerError>;
}
