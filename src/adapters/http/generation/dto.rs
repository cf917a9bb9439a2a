//! Data Transfer Objects for the generation HTTP API.
//!
//! Request bodies use camelCase field names to match the browser client.
//! Error bodies are `{error, error_code, details?}` across every endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::ValidationError;
use crate::domain::generation::{AspectRatio, GenerationRequest};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/generations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub reference_image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

impl GenerateRequest {
    /// Validates the body into a domain request.
    ///
    /// A missing aspect ratio defaults to `1:1`; an empty reference list is
    /// the same as none.
    pub fn into_domain(self) -> Result<GenerationRequest, ValidationError> {
        let aspect_ratio = match self.aspect_ratio.as_deref() {
            Some(tag) => tag.parse::<AspectRatio>()?,
            None => AspectRatio::default(),
        };
        GenerationRequest::new(
            self.prompt,
            self.reference_image_urls.unwrap_or_default(),
            aspect_ratio,
        )
    }
}

/// Query string of `GET /api/tasks/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusParams {
    pub task_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsResponse {
    pub credits: i64,
}

/// Acknowledgement returned to the provider for every accepted callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Body served for a task with no stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatusResponse {
    pub status: String,
}

impl PendingStatusResponse {
    pub fn pending() -> Self {
        Self {
            status: "pending".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_code: error_code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
