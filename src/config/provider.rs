//! Generation provider configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::provider::HttpProviderConfig;

use super::error::{is_http_url, ValidationError};
use super::server::Environment;

/// Generation provider configuration.
///
/// Every field may be left unset at startup; dispatch then fails fast with a
/// not-configured error instead of the server refusing to boot.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Job submission endpoint
    #[serde(default)]
    pub api_url: String,

    /// Provider credential
    #[serde(default)]
    pub api_key: String,

    /// Public base address of this service, for the completion callback
    #[serde(default)]
    pub callback_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Model name sent with each job
    #[serde(default = "default_model")]
    pub model: String,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// True when endpoint, credential and callback base are all set.
    pub fn is_complete(&self) -> bool {
        [&self.api_url, &self.api_key, &self.callback_base_url]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("PROVIDER__TIMEOUT_SECS"));
        }
        if !self.api_url.is_empty() && !is_http_url(&self.api_url) {
            return Err(ValidationError::InvalidUrl("PROVIDER__API_URL"));
        }
        if !self.callback_base_url.is_empty() {
            if !is_http_url(&self.callback_base_url) {
                return Err(ValidationError::InvalidUrl("PROVIDER__CALLBACK_BASE_URL"));
            }
            if *environment == Environment::Production
                && !self.callback_base_url.starts_with("https://")
            {
                return Err(ValidationError::MustBeHttps("PROVIDER__CALLBACK_BASE_URL"));
            }
        }
        Ok(())
    }

    /// Builds the adapter configuration.
    pub fn http_config(&self) -> HttpProviderConfig {
        HttpProviderConfig::new(
            self.api_url.clone(),
            Secret::new(self.api_key.clone()),
            self.callback_base_url.clone(),
        )
        .with_model(self.model.clone())
        .with_timeout(self.timeout())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            callback_base_url: String::new(),
            timeout_secs: default_timeout(),
            model: default_model(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_model() -> String {
    "image-gen-1".to_string()
}
