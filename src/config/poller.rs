//! Client poller configuration

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::client::HttpTaskStatusSource;
use crate::application::{PollerSettings, TaskPoller};
use crate::ports::PollTransportError;

use super::error::{is_http_url, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Seconds between status polls
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Total wall-clock budget in seconds
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Base URL of the orchestrator serving `/api/tasks/status`
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per-poll HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PollerConfig {
    pub fn settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_secs(self.interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            ..PollerSettings::default()
        }
    }

    /// Builds a poller talking to `server_url` over HTTP.
    pub fn task_poller(&self) -> Result<TaskPoller, PollTransportError> {
        let source = HttpTaskStatusSource::new(
            self.server_url.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(TaskPoller::new(Arc::new(source), self.settings()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_http_url(&self.server_url) {
            return Err(ValidationError::InvalidUrl("POLLER__SERVER_URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("POLLER__REQUEST_TIMEOUT_SECS"));
        }
        if self.interval_secs == 0 {
            return Err(ValidationError::MustBePositive("POLLER__INTERVAL_SECS"));
        }
        if self.max_wait_secs < self.interval_secs {
            return Err(ValidationError::PollWindowTooShort);
        }
        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_wait_secs: default_max_wait(),
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    2
}

fn default_max_wait() -> u64 {
    600
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
