//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers
//! (read). The task poller is the client half of the polling contract.

pub mod handlers;
pub mod task_poller;

pub use handlers::{
    AdmissionGuard, GetCreditsHandler, GetCreditsQuery, GetCreditsResult, GetTaskStatusHandler,
    GetTaskStatusQuery, GetTaskStatusResult, IngestWebhookCommand, IngestWebhookHandler,
    IngestWebhookResult, RequestGenerationCommand, RequestGenerationHandler,
    RequestGenerationResult,
};
pub use task_poller::{CompletedTask, PollError, PollerSettings, TaskPoller};
