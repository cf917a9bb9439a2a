//! GetTaskStatusHandler - Query handler backing the poll endpoint.

use std::sync::Arc;

use crate::domain::foundation::TaskId;
use crate::domain::generation::{GenerationError, TaskPayload, TaskState};
use crate::ports::TaskStore;

#[derive(Debug, Clone)]
pub struct GetTaskStatusQuery {
    pub task_id: TaskId,
}

/// What the store holds for a task id.
///
/// A never-dispatched id and a task still processing are indistinguishable;
/// both report `Pending`.
#[derive(Debug, Clone)]
pub enum GetTaskStatusResult {
    Pending,
    Stored(TaskPayload),
}

impl GetTaskStatusResult {
    pub fn state(&self) -> TaskState {
        match self {
            GetTaskStatusResult::Pending => TaskState::Pending,
            GetTaskStatusResult::Stored(payload) => payload.state(),
        }
    }
}

pub struct GetTaskStatusHandler {
    store: Arc<dyn TaskStore>,
}

impl GetTaskStatusHandler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetTaskStatusQuery,
    ) -> Result<GetTaskStatusResult, GenerationError> {
        let stored = self
            .store
            .get(&query.task_id)
            .await
            .map_err(|e| GenerationError::infrastructure(e.to_string()))?;

        match stored {
            Some(payload) => Ok(GetTaskStatusResult::Stored(payload)),
            None => {
                tracing::debug!(task_id = %query.task_id, "Task pending");
                Ok(GetTaskStatusResult::Pending)
            }
        }
    }
}
