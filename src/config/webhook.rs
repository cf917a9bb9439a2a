//! Provider webhook configuration

use secrecy::Secret;
use serde::Deserialize;

use crate::domain::generation::WebhookVerifier;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// HMAC secret; unset accepts unsigned callbacks
    pub secret: Option<String>,

    /// Maximum signature age in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: i64,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_age_secs <= 0 {
            return Err(ValidationError::MustBePositive("WEBHOOK__MAX_AGE_SECS"));
        }
        Ok(())
    }

    /// Verifier for signed mode, or `None` when no secret is set.
    pub fn verifier(&self) -> Option<WebhookVerifier> {
        self.secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| {
                WebhookVerifier::new(Secret::new(s.to_string()))
                    .with_max_age_secs(self.max_age_secs)
            })
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            max_age_secs: default_max_age(),
        }
    }
}

fn default_max_age() -> i64 {
    300
}
