//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `GEN_ORCHESTRATOR`
//! prefix and nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use gen_orchestrator::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod error;
mod ledger;
mod poller;
mod provider;
mod server;
mod task_store;
mod webhook;

pub use auth::AuthConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::{LedgerBackend, LedgerConfig, LedgerConsistency};
pub use poller::PollerConfig;
pub use provider::ProviderConfig;
pub use server::{Environment, ServerConfig};
pub use task_store::TaskStoreConfig;
pub use webhook::WebhookConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation provider endpoint, credential and callback base
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Bearer token verification
    #[serde(default)]
    pub auth: AuthConfig,

    /// Credit ledger backend and admission consistency
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Webhook signature verification
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Webhook payload retention
    #[serde(default)]
    pub task_store: TaskStoreConfig,

    /// Client poller cadence
    #[serde(default)]
    pub poller: PollerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `GEN_ORCHESTRATOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `GEN_ORCHESTRATOR__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `GEN_ORCHESTRATOR__PROVIDER__API_KEY=...` -> `provider.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("GEN_ORCHESTRATOR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.provider.validate(&self.server.environment)?;
        self.auth.validate()?;
        self.ledger.validate()?;
        self.webhook.validate()?;
        self.task_store.validate()?;
        self.poller.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
