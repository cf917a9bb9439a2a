//! Authentication configuration

use secrecy::Secret;
use serde::Deserialize;

use crate::adapters::auth::JwtConfig;

use super::error::ValidationError;

/// Bearer token verification settings (HS256 shared secret).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `iss` claim, if checked
    pub issuer: Option<String>,

    /// Expected `aud` claim, if checked
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        Ok(())
    }

    /// Builds the adapter configuration.
    pub fn jwt_config(&self) -> JwtConfig {
        let mut config = JwtConfig::new(Secret::new(self.jwt_secret.clone()));
        if let Some(issuer) = self.issuer.as_deref().filter(|s| !s.is_empty()) {
            config = config.with_issuer(issuer);
        }
        if let Some(audience) = self.audience.as_deref().filter(|s| !s.is_empty()) {
            config = config.with_audience(audience);
        }
        config
    }
}
