//! Generation handlers.
//!
//! ## Commands
//! - Admitting and dispatching a generation request
//! - Ingesting provider completion callbacks
//!
//! ## Queries
//! - Task status for polling clients
//! - Caller's credit balance

mod get_credits;
mod get_task_status;
mod ingest_webhook;
mod request_generation;

// Commands
pub use ingest_webhook::{IngestWebhookCommand, IngestWebhookHandler, IngestWebhookResult};
pub use request_generation::{
    AdmissionGuard, RequestGenerationCommand, RequestGenerationHandler, RequestGenerationResult,
    UserLocks, GENERATION_COST,
};

// Queries
pub use get_credits::{GetCreditsHandler, GetCreditsQuery, GetCreditsResult};
pub use get_task_status::{GetTaskStatusHandler, GetTaskStatusQuery, GetTaskStatusResult};
