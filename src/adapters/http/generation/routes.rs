//! Axum router configuration for generation endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    get_credits, get_task_status, health, ingest_webhook, request_generation, GenerationAppState,
};

/// Create the user-facing generation router.
///
/// # Routes (require authentication)
/// - `POST /generations` - Request a generation
/// - `GET /credits` - Current credit balance
pub fn generation_routes() -> Router<GenerationAppState> {
    Router::new()
        .route("/generations", post(request_generation))
        .route("/credits", get(get_credits))
}

/// Create the provider webhook router.
///
/// Separate from the user routes because callbacks carry no user token.
///
/// # Routes
/// - `POST /generation` - Provider completion callback
pub fn webhook_routes() -> Router<GenerationAppState> {
    Router::new().route("/generation", post(ingest_webhook))
}

/// Create the task polling router.
///
/// # Routes
/// - `GET /status?task_id=` - Stored payload or `{"status":"pending"}`
pub fn task_routes() -> Router<GenerationAppState> {
    Router::new().route("/status", get(get_task_status))
}

/// Create the complete `/api` router.
///
/// Only the user routes sit behind the auth middleware.
pub fn generation_router(auth: AuthState) -> Router<GenerationAppState> {
    Router::new()
        .merge(
            generation_routes()
                .route_layer(middleware::from_fn_with_state(auth, auth_middleware)),
        )
        .nest("/webhooks", webhook_routes())
        .nest("/tasks", task_routes())
}

/// Create the application router with state applied.
///
/// # Routes
/// - `GET /health`
/// - everything under `/api` from [`generation_router`]
pub fn app_router(state: GenerationAppState, auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", generation_router(auth))
        .with_state(state)
}
