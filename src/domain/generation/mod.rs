//! Generation domain - requests, task state and provider webhook handling.
//!
//! A generation starts as a transient [`GenerationRequest`], becomes a task
//! identified by a provider-minted [`TaskId`](crate::domain::foundation::TaskId)
//! once dispatched, and reaches a terminal [`TaskState`] when the provider's
//! webhook payload is ingested.

mod aspect_ratio;
mod errors;
mod progress;
mod request;
mod task;
mod webhook_verifier;

pub use aspect_ratio::AspectRatio;
pub use errors::GenerationError;
pub use progress::SimulatedProgress;
pub use request::{GenerationRequest, MAX_PROMPT_CHARS, MAX_REFERENCE_IMAGES};
pub use task::{TaskPayload, TaskState, GENERIC_FAILURE_MESSAGE};
pub use webhook_verifier::{
    compute_signature_header, SignatureHeader, WebhookSignatureError, WebhookVerifier,
    SIGNATURE_HEADER,
};
