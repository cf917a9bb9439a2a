//! Credit ledger configuration

use secrecy::Secret;
use serde::Deserialize;

use crate::adapters::ledger::ProfileStoreConfig;
use crate::application::AdmissionGuard;

use super::error::{is_http_url, ValidationError};

/// Where balances live.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    #[default]
    Memory,
    ProfileStore,
}

/// How concurrent admissions for one user are coordinated.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerConsistency {
    Unsynchronized,
    #[default]
    PerUser,
}

impl LedgerConsistency {
    pub fn admission_guard(self) -> AdmissionGuard {
        match self {
            LedgerConsistency::Unsynchronized => AdmissionGuard::Unsynchronized,
            LedgerConsistency::PerUser => AdmissionGuard::per_user(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,

    /// Profile store API base URL
    pub profile_store_url: Option<String>,

    /// Profile store secret key
    pub profile_store_secret: Option<String>,

    /// Balance given to users the in-memory ledger has not seen
    #[serde(default = "default_credits")]
    pub default_credits: i64,

    #[serde(default)]
    pub consistency: LedgerConsistency,
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_credits < 0 {
            return Err(ValidationError::NegativeDefaultCredits);
        }
        if self.backend == LedgerBackend::ProfileStore {
            let url = self
                .profile_store_url
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(ValidationError::MissingRequired("LEDGER__PROFILE_STORE_URL"))?;
            if !is_http_url(url) {
                return Err(ValidationError::InvalidUrl("LEDGER__PROFILE_STORE_URL"));
            }
            if self
                .profile_store_secret
                .as_deref()
                .map_or(true, |s| s.is_empty())
            {
                return Err(ValidationError::MissingRequired(
                    "LEDGER__PROFILE_STORE_SECRET",
                ));
            }
        }
        Ok(())
    }

    /// Profile store adapter configuration, when that backend is selected.
    pub fn profile_store_config(&self) -> Option<ProfileStoreConfig> {
        if self.backend != LedgerBackend::ProfileStore {
            return None;
        }
        let url = self.profile_store_url.clone()?;
        let secret = self.profile_store_secret.clone()?;
        Some(ProfileStoreConfig::new(url, Secret::new(secret)))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            profile_store_url: None,
            profile_store_secret: None,
            default_credits: default_credits(),
            consistency: LedgerConsistency::default(),
        }
    }
}

fn default_credits() -> i64 {
    5
}
