//! Generation provider port.
//!
//! The provider accepts a request, mints a task id and later reports the
//! outcome by calling back into the webhook receiver. Dispatch is a single
//! attempt; retries are left to the caller.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::TaskId;
use crate::domain::generation::GenerationRequest;

/// Errors from a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("dispatch cancelled")]
    Cancelled,
}

/// Provider acknowledgement of an accepted request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    /// Provider-minted task identifier.
    pub task_id: TaskId,
    /// Provider's acknowledgement body, echoed back to the caller.
    pub body: Value,
}

impl DispatchReceipt {
    pub fn new(task_id: TaskId, body: Value) -> Self {
        Self { task_id, body }
    }
}

/// Submits generation requests to the external provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submits one request.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` when endpoint, credentials or callback base are missing
    /// - `Unreachable` on connect failure or timeout
    /// - `Rejected` on a non-success status
    /// - `MalformedResponse` when the acknowledgement lacks a task id
    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchReceipt, ProviderError>;
}
