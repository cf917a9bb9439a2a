//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("{0} must be an http(s) URL")]
    InvalidUrl(&'static str),

    #[error("{0} must use HTTPS in production")]
    MustBeHttps(&'static str),

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Default credits cannot be negative")]
    NegativeDefaultCredits,

    #[error("Poll max wait must be at least one poll interval")]
    PollWindowTooShort,
}

/// Returns true for an absolute http(s) URL.
pub(crate) fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}
