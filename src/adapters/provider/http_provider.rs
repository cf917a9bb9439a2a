//! HTTP generation provider.
//!
//! Submits jobs to the external image-generation API. The provider answers
//! immediately with a task id and later POSTs the outcome to
//! `{callback_base_url}/api/webhooks/generation`. The callback address is the
//! same for every job; the provider includes the task id in its payload.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpProviderConfig::new(api_url, api_key, callback_base_url)
//!     .with_model("image-gen-2")
//!     .with_timeout(Duration::from_secs(60));
//!
//! let provider = HttpGenerationProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::domain::foundation::TaskId;
use crate::domain::generation::GenerationRequest;
use crate::ports::{DispatchReceipt, GenerationProvider, ProviderError};

/// Route the provider calls back on, relative to the public base address.
pub const CALLBACK_PATH: &str = "/api/webhooks/generation";

/// Output quality requested for every job.
const OUTPUT_QUALITY: &str = "high";

const DEFAULT_MODEL: &str = "image-gen-1";

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Job submission endpoint.
    pub api_url: String,
    api_key: Secret<String>,
    /// Public address of this service, used to build the callback URL.
    pub callback_base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl HttpProviderConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Secret<String>,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
            callback_base_url: callback_base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Callback URL handed to the provider.
    pub fn callback_url(&self) -> String {
        format!(
            "{}{}",
            self.callback_base_url.trim_end_matches('/'),
            CALLBACK_PATH
        )
    }

    /// Fails when any of endpoint, credential or callback base is blank.
    fn ensure_complete(&self) -> Result<(), ProviderError> {
        if self.api_url.trim().is_empty() {
            return Err(ProviderError::NotConfigured("provider api_url"));
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ProviderError::NotConfigured("provider api_key"));
        }
        if self.callback_base_url.trim().is_empty() {
            return Err(ProviderError::NotConfigured("provider callback_base_url"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "no_images")]
    image_urls: &'a [String],
    aspect_ratio: &'a str,
    quality: &'a str,
    callback_url: String,
}

fn no_images(urls: &&[String]) -> bool {
    urls.is_empty()
}

pub struct HttpGenerationProvider {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpGenerationProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|_| ProviderError::NotConfigured("provider HTTP client"))?;
        Ok(Self { config, client })
    }

    fn to_job_request<'a>(&'a self, request: &'a GenerationRequest) -> JobRequest<'a> {
        JobRequest {
            model: &self.config.model,
            prompt: request.prompt(),
            image_urls: request.reference_image_urls(),
            aspect_ratio: request.aspect_ratio().as_str(),
            quality: OUTPUT_QUALITY,
            callback_url: self.config.callback_url(),
        }
    }

    fn map_transport(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Unreachable("request timed out".to_string())
        } else if e.is_connect() {
            ProviderError::Unreachable(format!("connection failed: {}", e))
        } else {
            ProviderError::Unreachable(e.to_string())
        }
    }

    async fn handle_response_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Pulls a human-readable message out of a provider error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message", "msg"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Locates the task id in an acknowledgement body.
///
/// Accepts a top-level `task_id` or one nested under `data` as either
/// `task_id` or `taskId`.
fn extract_task_id(body: &Value) -> Option<TaskId> {
    let candidates = [
        body.get("task_id"),
        body.get("data").and_then(|d| d.get("task_id")),
        body.get("data").and_then(|d| d.get("taskId")),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find_map(|id| TaskId::new(id).ok())
}

/// Interprets a 2xx acknowledgement.
fn parse_acknowledgement(body: Value) -> Result<DispatchReceipt, ProviderError> {
    match extract_task_id(&body) {
        Some(task_id) => {
            let mut echoed = match body {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            echoed.insert(
                "task_id".to_string(),
                Value::String(task_id.as_str().to_string()),
            );
            Ok(DispatchReceipt::new(task_id, Value::Object(echoed)))
        }
        None => {
            // Some providers signal rejection inside a 200 body.
            if let Some(code) = body.get("code").and_then(Value::as_u64) {
                if code >= 400 {
                    let message = ["msg", "message", "error"]
                        .iter()
                        .find_map(|key| body.get(*key).and_then(Value::as_str))
                        .unwrap_or("request rejected")
                        .to_string();
                    return Err(ProviderError::Rejected {
                        status: code.min(u16::MAX as u64) as u16,
                        message,
                    });
                }
            }
            Err(ProviderError::MalformedResponse(
                "acknowledgement carries no task id".to_string(),
            ))
        }
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchReceipt, ProviderError> {
        self.config.ensure_complete()?;

        let job = self.to_job_request(request);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&job)
            .send()
            .await
            .map_err(Self::map_transport)?;

        let response = Self::handle_response_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let receipt = parse_acknowledgement(body)?;
        tracing::debug!(task_id = %receipt.task_id, "Provider accepted job");
        Ok(receipt)
    }
}
