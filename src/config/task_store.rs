//! Task store configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::task_store::TaskStoreLimits;

use super::error::ValidationError;

/// Bounds for the in-memory task store.
///
/// Setting `ttl_secs` and `capacity` to 0 keeps every payload forever.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStoreConfig {
    /// Entry lifetime in seconds; 0 disables expiry
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of stored payloads; 0 disables the cap
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// How often the reaper purges expired entries
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

impl TaskStoreConfig {
    pub fn limits(&self) -> TaskStoreLimits {
        TaskStoreLimits::new(
            (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs)),
            (self.capacity > 0).then_some(self.capacity),
        )
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reap_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("TASK_STORE__REAP_INTERVAL_SECS"));
        }
        Ok(())
    }
}

impl Default for TaskStoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            capacity: default_capacity(),
            reap_interval_secs: default_reap_interval(),
        }
    }
}

fn default_ttl() -> u64 {
    24 * 60 * 60
}

fn default_capacity() -> usize {
    10_000
}

fn default_reap_interval() -> u64 {
    60
}
