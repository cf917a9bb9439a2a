//! Client-side view of the task status endpoint.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::TaskId;

/// A single poll failed to produce a readable answer.
///
/// Pollers treat these as transient and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollTransportError {
    #[error("status endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("status endpoint returned HTTP {0}")]
    Status(u16),

    #[error("unreadable status body: {0}")]
    Decode(String),
}

/// Fetches the current status body for a task.
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    /// Returns the JSON body the status endpoint served for `task_id`.
    async fn poll(&self, task_id: &TaskId) -> Result<Value, PollTransportError>;
}
