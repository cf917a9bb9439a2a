//! HTTP handlers for generation endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::generation::{
    AdmissionGuard, GetCreditsHandler, GetCreditsQuery, GetTaskStatusHandler, GetTaskStatusQuery,
    GetTaskStatusResult, IngestWebhookCommand, IngestWebhookHandler, RequestGenerationCommand,
    RequestGenerationHandler,
};
use crate::domain::foundation::TaskId;
use crate::domain::generation::{GenerationError, WebhookVerifier, SIGNATURE_HEADER};
use crate::ports::{CreditLedger, GenerationProvider, TaskStore};

use super::dto::{
    CreditsResponse, ErrorResponse, GenerateRequest, HealthResponse, PendingStatusResponse,
    TaskStatusParams, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is Arc-wrapped.
#[derive(Clone)]
pub struct GenerationAppState {
    pub ledger: Arc<dyn CreditLedger>,
    pub provider: Arc<dyn GenerationProvider>,
    pub task_store: Arc<dyn TaskStore>,
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,
    pub admission_guard: AdmissionGuard,
    /// Parent of every in-flight dispatch's cancellation token.
    pub shutdown: CancellationToken,
}

impl GenerationAppState {
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        provider: Arc<dyn GenerationProvider>,
        task_store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            ledger,
            provider,
            task_store,
            webhook_verifier: None,
            admission_guard: AdmissionGuard::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_webhook_verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.webhook_verifier = Some(Arc::new(verifier));
        self
    }

    pub fn with_admission_guard(mut self, guard: AdmissionGuard) -> Self {
        self.admission_guard = guard;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Create handlers on demand from the shared state.
    pub fn request_generation_handler(&self) -> RequestGenerationHandler {
        RequestGenerationHandler::new(
            self.ledger.clone(),
            self.provider.clone(),
            self.admission_guard.clone(),
        )
    }

    pub fn get_credits_handler(&self) -> GetCreditsHandler {
        GetCreditsHandler::new(self.ledger.clone())
    }

    pub fn ingest_webhook_handler(&self) -> IngestWebhookHandler {
        IngestWebhookHandler::new(self.task_store.clone(), self.webhook_verifier.clone())
    }

    pub fn get_task_status_handler(&self) -> GetTaskStatusHandler {
        GetTaskStatusHandler::new(self.task_store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/generations - Admit, dispatch and debit one generation
///
/// Responds with the provider's acknowledgement, which carries `task_id`.
pub async fn request_generation(
    State(state): State<GenerationAppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GenerationApiError> {
    let Json(request) = body.map_err(|rejection| {
        GenerationError::validation("body", rejection.body_text())
    })?;
    let request = request.into_domain().map_err(GenerationError::from)?;

    let handler = state.request_generation_handler();
    let cmd = RequestGenerationCommand::new(user.id, request)
        .with_cancellation(state.shutdown.child_token());

    let result = handler.handle(cmd).await?;

    Ok(Json(result.provider_response))
}

/// POST /api/webhooks/generation - Ingest a provider completion callback
///
/// Unauthenticated; verified by signature when a secret is configured.
/// Payloads without a task id are acknowledged and dropped.
pub async fn ingest_webhook(
    State(state): State<GenerationAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, GenerationApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.ingest_webhook_handler();
    let cmd = IngestWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    handler.handle(cmd).await?;

    Ok(Json(WebhookAck::received()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/credits - Current balance of the caller
pub async fn get_credits(
    State(state): State<GenerationAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, GenerationApiError> {
    let handler = state.get_credits_handler();
    let result = handler.handle(GetCreditsQuery { user_id: user.id }).await?;

    Ok(Json(CreditsResponse {
        credits: result.balance,
    }))
}

/// GET /api/tasks/status?task_id= - Poll a task
///
/// Serves the stored webhook body byte-for-byte, or `{"status":"pending"}`
/// when nothing has arrived for the id.
pub async fn get_task_status(
    State(state): State<GenerationAppState>,
    Query(params): Query<TaskStatusParams>,
) -> Result<Response, GenerationApiError> {
    let task_id = params
        .task_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| GenerationError::validation("task_id", "task_id is required"))?;
    let task_id = TaskId::new(task_id).map_err(GenerationError::from)?;

    let handler = state.get_task_status_handler();
    let result = handler.handle(GetTaskStatusQuery { task_id }).await?;

    let response = match result {
        GetTaskStatusResult::Pending => Json(PendingStatusResponse::pending()).into_response(),
        GetTaskStatusResult::Stored(payload) => (
            [(header::CONTENT_TYPE, "application/json")],
            Bytes::copy_from_slice(payload.raw()),
        )
            .into_response(),
    };

    Ok(response)
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct GenerationApiError(GenerationError);

impl From<GenerationError> for GenerationApiError {
    fn from(err: GenerationError) -> Self {
        Self(err)
    }
}

impl GenerationApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GenerationError::Unauthorized => StatusCode::UNAUTHORIZED,
            GenerationError::InsufficientCredits { .. } => StatusCode::FORBIDDEN,
            GenerationError::ProviderUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
            GenerationError::DispatchFailed(_) => StatusCode::BAD_GATEWAY,
            GenerationError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            GenerationError::MalformedWebhook(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GenerationError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            GenerationError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GenerationApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if self.0.is_retryable() {
                tracing::warn!(error_code = self.0.code(), error = %self.0, "Upstream unavailable");
            } else {
                tracing::error!(error_code = self.0.code(), error = %self.0, "Request failed");
            }
        }

        let mut body = ErrorResponse::new(self.0.code(), self.0.message());
        match &self.0 {
            GenerationError::InsufficientCredits { balance } => {
                body = body.with_details(json!({ "balance": balance }));
            }
            GenerationError::ValidationFailed { field, .. } => {
                body = body.with_details(json!({ "field": field }));
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
