//! Polls `GET {base_url}/api/tasks/status?task_id=...` over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::domain::foundation::TaskId;
use crate::ports::{PollTransportError, TaskStatusSource};

const STATUS_PATH: &str = "/api/tasks/status";

pub struct HttpTaskStatusSource {
    base_url: String,
    client: Client,
}

impl HttpTaskStatusSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PollTransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PollTransportError::Unreachable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn status_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), STATUS_PATH)
    }
}

#[async_trait]
impl TaskStatusSource for HttpTaskStatusSource {
    async fn poll(&self, task_id: &TaskId) -> Result<Value, PollTransportError> {
        let response = self
            .client
            .get(self.status_url())
            .query(&[("task_id", task_id.as_str())])
            .send()
            .await
            .map_err(|e| PollTransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollTransportError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PollTransportError::Decode(e.to_string()))
    }
}
