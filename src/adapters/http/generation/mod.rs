//! HTTP adapter for generation, credits, webhook and polling endpoints.

pub mod dto;
mod handlers;
mod routes;

pub use dto::{
    CreditsResponse, ErrorResponse, GenerateRequest, PendingStatusResponse, TaskStatusParams,
    WebhookAck,
};
pub use handlers::{
    get_credits, get_task_status, health, ingest_webhook, request_generation,
    GenerationApiError, GenerationAppState,
};
pub use routes::{app_router, generation_router, generation_routes, task_routes, webhook_routes};
