//! Task store port.
//!
//! Holds the latest webhook payload per task id. Writes for the same id
//! overwrite; a read of an id that was never written returns `None`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::TaskId;
use crate::domain::generation::TaskPayload;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskStoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores `payload` under `task_id`, replacing any previous payload.
    async fn put(&self, task_id: TaskId, payload: TaskPayload) -> Result<(), TaskStoreError>;

    /// Latest payload for `task_id`, if one has been written and not evicted.
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskPayload>, TaskStoreError>;

    /// Number of entries currently held.
    async fn len(&self) -> Result<usize, TaskStoreError>;

    /// Drops entries past their retention. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, TaskStoreError>;
}
