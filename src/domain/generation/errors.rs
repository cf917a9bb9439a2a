//! Generation-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 401 |
//! | InsufficientCredits | 403 |
//! | ProviderUnreachable | 503 |
//! | ProviderRejected | 502 |
//! | DispatchFailed | 502 |
//! | LedgerUnavailable | 503 |
//! | InvalidWebhookSignature | 401 |
//! | MalformedWebhook | 500 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::ValidationError;

/// Errors surfaced by the generation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Caller has no authenticated identity.
    Unauthorized,

    /// The caller's balance does not cover one generation.
    InsufficientCredits { balance: i64 },

    /// The provider could not be reached (connect failure or timeout).
    ProviderUnreachable(String),

    /// The provider answered with a non-success status.
    ProviderRejected(String),

    /// Dispatch failed for any other reason (bad response, not configured, cancelled).
    DispatchFailed(String),

    /// The credit ledger could not be read.
    LedgerUnavailable(String),

    /// Webhook signature verification failed.
    InvalidWebhookSignature,

    /// Webhook body could not be parsed as JSON.
    MalformedWebhook(String),

    /// Request input failed validation.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl GenerationError {
    pub fn insufficient_credits(balance: i64) -> Self {
        GenerationError::InsufficientCredits { balance }
    }

    pub fn provider_unreachable(message: impl Into<String>) -> Self {
        GenerationError::ProviderUnreachable(message.into())
    }

    pub fn provider_rejected(message: impl Into<String>) -> Self {
        GenerationError::ProviderRejected(message.into())
    }

    pub fn dispatch_failed(message: impl Into<String>) -> Self {
        GenerationError::DispatchFailed(message.into())
    }

    pub fn ledger_unavailable(message: impl Into<String>) -> Self {
        GenerationError::LedgerUnavailable(message.into())
    }

    pub fn malformed_webhook(message: impl Into<String>) -> Self {
        GenerationError::MalformedWebhook(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        GenerationError::Infrastructure(message.into())
    }

    /// Machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Unauthorized => "UNAUTHORIZED",
            GenerationError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            GenerationError::ProviderUnreachable(_) => "PROVIDER_UNREACHABLE",
            GenerationError::ProviderRejected(_) => "PROVIDER_REJECTED",
            GenerationError::DispatchFailed(_) => "DISPATCH_FAILED",
            GenerationError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            GenerationError::InvalidWebhookSignature => "INVALID_WEBHOOK_SIGNATURE",
            GenerationError::MalformedWebhook(_) => "WEBHOOK_PROCESSING_FAILED",
            GenerationError::ValidationFailed { .. } => "VALIDATION_FAILED",
            GenerationError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            GenerationError::Unauthorized => "Unauthorized".to_string(),
            GenerationError::InsufficientCredits { .. } => {
                "Insufficient credits. Please purchase more credits to continue.".to_string()
            }
            GenerationError::ProviderUnreachable(reason) => format!(
                "Image generation service is unavailable ({}). Please try again.",
                reason
            ),
            GenerationError::ProviderRejected(reason) => format!(
                "Image generation request was rejected: {}. Please try again.",
                reason
            ),
            GenerationError::DispatchFailed(reason) => format!(
                "Failed to start image generation: {}. Please try again.",
                reason
            ),
            GenerationError::LedgerUnavailable(_) => {
                "Credit balance is temporarily unavailable. Please try again.".to_string()
            }
            GenerationError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            GenerationError::MalformedWebhook(_) => "Webhook processing failed".to_string(),
            GenerationError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            GenerationError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// True when the caller can retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::ProviderUnreachable(_)
                | GenerationError::ProviderRejected(_)
                | GenerationError::DispatchFailed(_)
                | GenerationError::LedgerUnavailable(_)
        )
    }
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GenerationError {}

impl From<ValidationError> for GenerationError {
    fn from(err: ValidationError) -> Self {
        GenerationError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
