//! IngestWebhookHandler - Command handler for provider completion callbacks.

use std::sync::Arc;

use crate::domain::foundation::TaskId;
use crate::domain::generation::{GenerationError, TaskPayload, TaskState, WebhookVerifier};
use crate::ports::TaskStore;

/// Command carrying one raw callback.
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    /// Body exactly as received.
    pub payload: Vec<u8>,
    /// `X-Webhook-Signature` header value, if present.
    pub signature: Option<String>,
}

/// Result of ingestion. Both variants are acknowledged to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestWebhookResult {
    /// Payload stored under its task id.
    Stored { task_id: TaskId, state: TaskState },
    /// Payload carried no usable task id; nothing was stored.
    Ignored,
}

/// Handler for ingesting provider callbacks into the task store.
///
/// With a verifier configured, unsigned or mis-signed callbacks are refused
/// before the body is parsed.
pub struct IngestWebhookHandler {
    store: Arc<dyn TaskStore>,
    verifier: Option<Arc<WebhookVerifier>>,
}

impl IngestWebhookHandler {
    pub fn new(store: Arc<dyn TaskStore>, verifier: Option<Arc<WebhookVerifier>>) -> Self {
        Self { store, verifier }
    }

    pub async fn handle(
        &self,
        cmd: IngestWebhookCommand,
    ) -> Result<IngestWebhookResult, GenerationError> {
        // 1. Verify signature when a secret is configured
        if let Some(verifier) = &self.verifier {
            verifier
                .verify(&cmd.payload, cmd.signature.as_deref())
                .map_err(|e| {
                    tracing::warn!(error = %e, "Rejected provider webhook");
                    GenerationError::InvalidWebhookSignature
                })?;
        }

        // 2. Parse as untyped JSON, keeping the original bytes
        let payload = TaskPayload::parse(&cmd.payload).map_err(|e| {
            tracing::error!(error = %e, bytes = cmd.payload.len(), "Webhook body is not JSON");
            GenerationError::malformed_webhook(e.to_string())
        })?;

        // 3. Store under task_id, or acknowledge and drop
        let Some(task_id) = payload.task_id() else {
            tracing::warn!("Webhook carried no task_id; nothing stored");
            return Ok(IngestWebhookResult::Ignored);
        };

        let state = payload.state();
        self.store
            .put(task_id.clone(), payload)
            .await
            .map_err(|e| GenerationError::infrastructure(e.to_string()))?;

        tracing::info!(
            task_id = %task_id,
            status = state.as_str(),
            terminal = state.is_terminal(),
            "Webhook payload stored"
        );

        Ok(IngestWebhookResult::Stored { task_id, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::task_store::InMemoryTaskStore;
    use crate::domain::generation::compute_signature_header;
    use secrecy::Secret;

    const SECRET: &str = "whsec_test";

    fn handler(store: Arc<InMemoryTaskStore>) -> IngestWebhookHandler {
        IngestWebhookHandler::new(store, None)
    }

    fn signed_handler(store: Arc<InMemoryTaskStore>) -> IngestWebhookHandler {
        IngestWebhookHandler::new(
            store,
            Some(Arc::new(WebhookVerifier::new(Secret::new(SECRET.to_string())))),
        )
    }

    fn unsigned(body: &str) -> IngestWebhookCommand {
        IngestWebhookCommand {
            payload: body.as_bytes().to_vec(),
            signature: None,
        }
    }

    #[tokio::test]
    async fn stores_payload_verbatim_under_task_id() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        let body = r#"{"task_id":"abc123", "status":"completed","result":"https://cdn.example/img.png"}"#;

        let result = handler(store.clone()).handle(unsigned(body)).await.unwrap();

        let task_id = TaskId::new("abc123").unwrap();
        assert_eq!(
            result,
            IngestWebhookResult::Stored {
                task_id: task_id.clone(),
                state: TaskState::Completed {
                    result: "https://cdn.example/img.png".to_string()
                }
            }
        );
        let stored = store.get(&task_id).await.unwrap().unwrap();
        assert_eq!(stored.raw(), body.as_bytes());
    }

    #[tokio::test]
    async fn payload_without_task_id_is_acknowledged_and_dropped() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        for body in [r#"{"status":"completed"}"#, r#"{"task_id":""}"#, "[1,2,3]"] {
            let result = handler(store.clone()).handle(unsigned(body)).await.unwrap();
            assert_eq!(result, IngestWebhookResult::Ignored);
        }
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        let err = handler(store.clone())
            .handle(unsigned("task_id=abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedWebhook(_)));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn redelivery_overwrites_previous_payload() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        let handler = handler(store.clone());
        handler
            .handle(unsigned(r#"{"task_id":"t1","status":"processing"}"#))
            .await
            .unwrap();
        handler
            .handle(unsigned(r#"{"task_id":"t1","status":"failed","error":"provider overloaded"}"#))
            .await
            .unwrap();

        let stored = store.get(&TaskId::new("t1").unwrap()).await.unwrap().unwrap();
        assert_eq!(
            stored.state(),
            TaskState::Failed {
                error: "provider overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn signed_mode_rejects_missing_signature() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        let err = signed_handler(store.clone())
            .handle(unsigned(r#"{"task_id":"t1"}"#))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::InvalidWebhookSignature);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn signed_mode_accepts_valid_signature() {
        let store = Arc::new(InMemoryTaskStore::unbounded());
        let body = br#"{"task_id":"t1","status":"completed","result":"https://cdn/x.png"}"#;
        let signature =
            compute_signature_header(SECRET, chrono::Utc::now().timestamp(), body);

        let result = signed_handler(store.clone())
            .handle(IngestWebhookCommand {
                payload: body.to_vec(),
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert!(matches!(result, IngestWebhookResult::Stored { .. }));
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
