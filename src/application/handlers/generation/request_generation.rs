//! RequestGenerationHandler - Command handler for admitting and dispatching a generation.
//!
//! Admission reads the caller's balance, refuses when it is below one credit,
//! dispatches to the provider and, once the provider has accepted the job,
//! writes back `balance - 1`. The debit is charged on acceptance, not on
//! completion, so a job the provider later fails still costs a credit.
//!
//! The ledger offers only read and overwrite. Under
//! [`AdmissionGuard::Unsynchronized`] two concurrent requests from one user
//! can both read the same balance and both be admitted.
//! [`AdmissionGuard::PerUser`] holds a per-user lock across the whole
//! check, dispatch and debit sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{TaskId, UserId};
use crate::domain::generation::{GenerationError, GenerationRequest};
use crate::ports::{CreditLedger, GenerationProvider, ProviderError};

/// Credits charged per accepted generation.
pub const GENERATION_COST: i64 = 1;

/// Lock table pruning kicks in above this many idle entries.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

/// Command to request one generation.
#[derive(Debug, Clone)]
pub struct RequestGenerationCommand {
    pub user_id: UserId,
    pub request: GenerationRequest,
    /// Cancelling aborts an in-flight dispatch; the balance is left untouched.
    pub cancellation: CancellationToken,
}

impl RequestGenerationCommand {
    pub fn new(user_id: UserId, request: GenerationRequest) -> Self {
        Self {
            user_id,
            request,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Result of an accepted generation.
#[derive(Debug, Clone)]
pub struct RequestGenerationResult {
    pub task_id: TaskId,
    /// Provider acknowledgement, including `task_id`.
    pub provider_response: Value,
    /// Balance written back after the debit, or `None` if the write failed.
    pub remaining_credits: Option<i64>,
}

/// Per-user mutual exclusion for admission.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// How concurrent admissions for the same user are coordinated.
#[derive(Debug, Clone)]
pub enum AdmissionGuard {
    /// No coordination; check-then-act races are possible.
    Unsynchronized,
    /// Check, dispatch and debit run one at a time per user.
    PerUser(Arc<UserLocks>),
}

impl AdmissionGuard {
    pub fn per_user() -> Self {
        AdmissionGuard::PerUser(Arc::new(UserLocks::default()))
    }

    async fn enter(&self, user_id: &UserId) -> Option<OwnedMutexGuard<()>> {
        match self {
            AdmissionGuard::Unsynchronized => None,
            AdmissionGuard::PerUser(locks) => Some(locks.acquire(user_id).await),
        }
    }
}

impl Default for AdmissionGuard {
    fn default() -> Self {
        Self::per_user()
    }
}

/// Handler for admitting and dispatching generation requests.
pub struct RequestGenerationHandler {
    ledger: Arc<dyn CreditLedger>,
    provider: Arc<dyn GenerationProvider>,
    guard: AdmissionGuard,
}

impl RequestGenerationHandler {
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        provider: Arc<dyn GenerationProvider>,
        guard: AdmissionGuard,
    ) -> Self {
        Self {
            ledger,
            provider,
            guard,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestGenerationCommand,
    ) -> Result<RequestGenerationResult, GenerationError> {
        let _permit = self.guard.enter(&cmd.user_id).await;

        // 1. Check balance
        let balance = self.ledger.balance(&cmd.user_id).await.map_err(|e| {
            tracing::warn!(user_id = %cmd.user_id, error = %e, "Credit balance read failed");
            GenerationError::ledger_unavailable(e.to_string())
        })?;

        if balance < GENERATION_COST {
            tracing::debug!(user_id = %cmd.user_id, balance, "Admission rejected: insufficient credits");
            return Err(GenerationError::insufficient_credits(balance));
        }

        // 2. Dispatch
        let dispatch = self.provider.dispatch(&cmd.request);
        let outcome = tokio::select! {
            biased;
            _ = cmd.cancellation.cancelled() => Err(ProviderError::Cancelled),
            outcome = dispatch => outcome,
        };
        let receipt = outcome.map_err(|e| {
            tracing::warn!(user_id = %cmd.user_id, error = %e, "Dispatch failed");
            map_provider_error(e)
        })?;

        // 3. Debit, overwriting with the value derived from the earlier read
        let remaining = balance - GENERATION_COST;
        let remaining_credits = match self.ledger.set_balance(&cmd.user_id, remaining).await {
            Ok(()) => Some(remaining),
            Err(e) => {
                tracing::error!(
                    user_id = %cmd.user_id,
                    task_id = %receipt.task_id,
                    error = %e,
                    "Credit debit failed after provider accepted the job"
                );
                None
            }
        };

        tracing::info!(
            user_id = %cmd.user_id,
            task_id = %receipt.task_id,
            aspect_ratio = %cmd.request.aspect_ratio(),
            references = cmd.request.reference_image_urls().len(),
            "Generation dispatched"
        );

        Ok(RequestGenerationResult {
            task_id: receipt.task_id,
            provider_response: receipt.body,
            remaining_credits,
        })
    }
}

fn map_provider_error(err: ProviderError) -> GenerationError {
    match err {
        ProviderError::Unreachable(msg) => GenerationError::provider_unreachable(msg),
        ProviderError::Rejected { message, .. } => GenerationError::provider_rejected(message),
        other => GenerationError::dispatch_failed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ledger::InMemoryCreditLedger;
    use crate::adapters::provider::MockGenerationProvider;
    use crate::domain::generation::AspectRatio;
    use crate::ports::LedgerError;
    use async_trait::async_trait;
    use std::time::Duration;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("neon skyline", vec![], AspectRatio::Landscape16x9).unwrap()
    }

    async fn ledger_with(balance: i64) -> Arc<InMemoryCreditLedger> {
        Arc::new(InMemoryCreditLedger::new(0).with_balance(user(), balance).await)
    }

    /// Reads succeed with a fixed balance; writes always fail.
    struct ReadOnlyLedger(i64);

    #[async_trait]
    impl CreditLedger for ReadOnlyLedger {
        async fn balance(&self, _user_id: &UserId) -> Result<i64, LedgerError> {
            Ok(self.0)
        }

        async fn set_balance(&self, _user_id: &UserId, _balance: i64) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("write refused".to_string()))
        }
    }

    struct DownLedger;

    #[async_trait]
    impl CreditLedger for DownLedger {
        async fn balance(&self, _user_id: &UserId) -> Result<i64, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }

        async fn set_balance(&self, _user_id: &UserId, _balance: i64) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Admission
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn accepted_dispatch_debits_one_credit() {
        let ledger = ledger_with(5).await;
        let provider = Arc::new(MockGenerationProvider::new().with_task_id("abc123"));
        let handler =
            RequestGenerationHandler::new(ledger.clone(), provider.clone(), AdmissionGuard::default());

        let result = handler
            .handle(RequestGenerationCommand::new(user(), request()))
            .await
            .unwrap();

        assert_eq!(result.task_id.as_str(), "abc123");
        assert_eq!(result.provider_response["task_id"], "abc123");
        assert_eq!(result.remaining_credits, Some(4));
        assert_eq!(ledger.balance(&user()).await.unwrap(), 4);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn zero_balance_never_reaches_provider() {
        let ledger = ledger_with(0).await;
        let provider = Arc::new(MockGenerationProvider::new());
        let handler =
            RequestGenerationHandler::new(ledger.clone(), provider.clone(), AdmissionGuard::default());

        let err = handler
            .handle(RequestGenerationCommand::new(user(), request()))
            .await
            .unwrap_err();

        assert_eq!(err, GenerationError::insufficient_credits(0));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(ledger.balance(&user()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn negative_balance_is_insufficient() {
        let ledger = ledger_with(-2).await;
        let provider = Arc::new(MockGenerationProvider::new());
        let handler = RequestGenerationHandler::new(ledger, provider.clone(), AdmissionGuard::default());

        let err = handler
            .handle(RequestGenerationCommand::new(user(), request()))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::InsufficientCredits { balance: -2 }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn dispatch_failure_leaves_balance_untouched() {
        let cases = [
            (
                ProviderError::Unreachable("timeout".to_string()),
                "PROVIDER_UNREACHABLE",
            ),
            (
                ProviderError::Rejected {
                    status: 500,
                    message: "overloaded".to_string(),
                },
                "PROVIDER_REJECTED",
            ),
            (
                ProviderError::MalformedResponse("no task id".to_string()),
                "DISPATCH_FAILED",
            ),
            (ProviderError::NotConfigured("provider api_key"), "DISPATCH_FAILED"),
        ];

        for (provider_error, code) in cases {
            let ledger = ledger_with(3).await;
            let provider = Arc::new(MockGenerationProvider::new().with_error(provider_error));
            let handler =
                RequestGenerationHandler::new(ledger.clone(), provider, AdmissionGuard::default());

            let err = handler
                .handle(RequestGenerationCommand::new(user(), request()))
                .await
                .unwrap_err();

            assert_eq!(err.code(), code);
            assert_eq!(ledger.balance(&user()).await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn unreadable_ledger_is_unavailable_and_skips_dispatch() {
        let provider = Arc::new(MockGenerationProvider::new());
        let handler = RequestGenerationHandler::new(
            Arc::new(DownLedger),
            provider.clone(),
            AdmissionGuard::default(),
        );

        let err = handler
            .handle(RequestGenerationCommand::new(user(), request()))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::LedgerUnavailable(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn debit_failure_still_returns_task_id() {
        let provider = Arc::new(MockGenerationProvider::new().with_task_id("abc123"));
        let handler = RequestGenerationHandler::new(
            Arc::new(ReadOnlyLedger(2)),
            provider,
            AdmissionGuard::default(),
        );

        let result = handler
            .handle(RequestGenerationCommand::new(user(), request()))
            .await
            .unwrap();

        assert_eq!(result.task_id.as_str(), "abc123");
        assert_eq!(result.remaining_credits, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cancellation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(start_paused = true)]
    async fn cancelled_dispatch_does_not_debit() {
        let ledger = ledger_with(3).await;
        let provider = Arc::new(MockGenerationProvider::new().with_delay(Duration::from_secs(30)));
        let handler =
            RequestGenerationHandler::new(ledger.clone(), provider, AdmissionGuard::default());

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = handler
            .handle(RequestGenerationCommand::new(user(), request()).with_cancellation(token))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "DISPATCH_FAILED");
        assert_eq!(ledger.balance(&user()).await.unwrap(), 3);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Concurrency
    // ════════════════════════════════════════════════════════════════════════════

    async fn run_concurrently(
        handler: Arc<RequestGenerationHandler>,
        n: usize,
    ) -> Vec<Result<RequestGenerationResult, GenerationError>> {
        let tasks: Vec<_> = (0..n)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .handle(RequestGenerationCommand::new(user(), request()))
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(n);
        for task in tasks {
            results.push(task.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn unsynchronized_admission_over_admits_with_one_credit() {
        const N: usize = 4;
        let ledger = ledger_with(1).await;
        // Every dispatch waits until all N callers have read the balance.
        let provider = Arc::new(MockGenerationProvider::new().with_barrier(N));
        let handler = Arc::new(RequestGenerationHandler::new(
            ledger.clone(),
            provider.clone(),
            AdmissionGuard::Unsynchronized,
        ));

        let results = run_concurrently(handler, N).await;

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        assert!(admitted > 1, "expected the race to admit more than one request");
        assert_eq!(provider.call_count(), N);
        assert_eq!(ledger.balance(&user()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn per_user_admission_admits_exactly_one_with_one_credit() {
        const N: usize = 4;
        let ledger = ledger_with(1).await;
        let provider = Arc::new(MockGenerationProvider::new().with_delay(Duration::from_millis(20)));
        let handler = Arc::new(RequestGenerationHandler::new(
            ledger.clone(),
            provider.clone(),
            AdmissionGuard::per_user(),
        ));

        let results = run_concurrently(handler, N).await;

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(GenerationError::InsufficientCredits { .. })))
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(rejected, N - 1);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(ledger.balance(&user()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn per_user_lock_does_not_block_other_users() {
        let locks = UserLocks::default();
        let _held = locks.acquire(&user()).await;
        let other = UserId::new("user-2").unwrap();
        let acquired =
            tokio::time::timeout(Duration::from_millis(100), locks.acquire(&other)).await;
        assert!(acquired.is_ok());
    }
}
