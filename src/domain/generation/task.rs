//! Task payloads and the tagged task state derived from them.
//!
//! The provider's webhook body is stored verbatim as a [`TaskPayload`]. The
//! poll endpoint hands those bytes back untouched; [`TaskState`] is the typed
//! reading of the same payload used wherever a decision has to be made.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::foundation::TaskId;

/// Shown when a failed task carries no error description of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Image generation failed";

const COMPLETED_MARKERS: [&str; 3] = ["completed", "success", "succeeded"];
const FAILED_MARKERS: [&str; 3] = ["failed", "fail", "error"];

/// A webhook payload exactly as the provider sent it, plus its parsed form.
#[derive(Debug, Clone)]
pub struct TaskPayload {
    raw: Arc<[u8]>,
    fields: Value,
}

impl TaskPayload {
    /// Parses a body as untyped JSON while keeping the original bytes.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let fields = serde_json::from_slice(body)?;
        Ok(Self {
            raw: Arc::from(body),
            fields,
        })
    }

    /// Original bytes, byte-for-byte.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn fields(&self) -> &Value {
        &self.fields
    }

    /// The `task_id` field when it is a non-blank string.
    ///
    /// Non-object bodies, missing keys, non-string values and blank strings
    /// all read as "no task id".
    pub fn task_id(&self) -> Option<TaskId> {
        self.fields
            .get("task_id")
            .and_then(Value::as_str)
            .and_then(|id| TaskId::new(id).ok())
    }

    /// Typed reading of the payload's embedded status.
    pub fn state(&self) -> TaskState {
        TaskState::from_fields(&self.fields)
    }
}

/// Explicit task lifecycle as observed through the task store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// No terminal payload has been observed yet.
    Pending,
    /// The provider produced an artifact at `result`.
    Completed { result: String },
    /// The provider gave up on the task.
    Failed { error: String },
}

impl TaskState {
    /// Interprets a JSON object carrying `status`, `result` and `error` fields.
    ///
    /// A completed status without a non-empty `result` is not terminal and
    /// reads as pending.
    pub fn from_fields(fields: &Value) -> Self {
        let status = fields
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_ascii_lowercase());

        let Some(status) = status else {
            return TaskState::Pending;
        };

        if COMPLETED_MARKERS.contains(&status.as_str()) {
            return match non_empty_str(fields, "result") {
                Some(result) => TaskState::Completed { result },
                None => TaskState::Pending,
            };
        }

        if FAILED_MARKERS.contains(&status.as_str()) {
            let error = non_empty_str(fields, "error")
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            return TaskState::Failed { error };
        }

        TaskState::Pending
    }

    /// Completed and Failed are terminal; the task will not transition further.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Completed { .. } => "completed",
            TaskState::Failed { .. } => "failed",
        }
    }
}

fn non_empty_str(fields: &Value, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
