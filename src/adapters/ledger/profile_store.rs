//! Profile-store credit ledger.
//!
//! Reads and writes the `credits` attribute in a user's public metadata via
//! the identity provider's backend API:
//!
//! - `GET {base_url}/users/{user_id}` returns `{"public_metadata": {"credits": n, ...}, ...}`
//! - `PATCH {base_url}/users/{user_id}/metadata` with `{"public_metadata": {"credits": n}}`
//!
//! The store has no conditional write, so concurrent read-modify-write cycles
//! for the same user can lose updates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use crate::domain::foundation::UserId;
use crate::ports::{CreditLedger, LedgerError};

const CREDITS_KEY: &str = "credits";

/// Configuration for [`ProfileStoreCreditLedger`].
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub base_url: String,
    secret_key: Secret<String>,
    pub timeout: Duration,
}

impl ProfileStoreConfig {
    pub fn new(base_url: impl Into<String>, secret_key: Secret<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret_key,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ProfileStoreCreditLedger {
    config: ProfileStoreConfig,
    base_url: Url,
    client: Client,
}

impl ProfileStoreCreditLedger {
    pub fn new(config: ProfileStoreConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                LedgerError::Unavailable(format!("invalid profile store URL: {}", config.base_url))
            })?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// `{base_url}/users/{user_id}[/{suffix}]` with the id percent-encoded as one segment.
    fn user_url(&self, user_id: &UserId, suffix: Option<&str>) -> Result<Url, LedgerError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                LedgerError::Unavailable(format!("invalid profile store URL: {}", self.base_url))
            })?;
            segments.pop_if_empty().push("users").push(user_id.as_str());
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn map_transport(e: reqwest::Error) -> LedgerError {
        if e.is_timeout() {
            LedgerError::Unavailable("request timed out".to_string())
        } else if e.is_connect() {
            LedgerError::Unavailable(format!("connection failed: {}", e))
        } else {
            LedgerError::Unavailable(e.to_string())
        }
    }

    async fn check_status(response: Response) -> Result<Response, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            500..=599 => Err(LedgerError::Unavailable(format!(
                "server error {}: {}",
                status, body
            ))),
            _ => Err(LedgerError::Rejected(format!("status {}: {}", status, body))),
        }
    }
}

/// Extracts `public_metadata.credits`; missing reads as zero.
///
/// Some dashboards store the attribute as a numeric string, so both
/// representations are accepted.
fn credits_from_profile(profile: &Value) -> Result<i64, LedgerError> {
    let Some(value) = profile
        .get("public_metadata")
        .and_then(|metadata| metadata.get(CREDITS_KEY))
    else {
        return Ok(0);
    };

    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64))
            .ok_or_else(|| LedgerError::MalformedResponse(format!("credits out of range: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| LedgerError::MalformedResponse(format!("credits not numeric: {:?}", s))),
        other => Err(LedgerError::MalformedResponse(format!(
            "credits has unexpected type: {}",
            other
        ))),
    }
}

#[async_trait]
impl CreditLedger for ProfileStoreCreditLedger {
    async fn balance(&self, user_id: &UserId) -> Result<i64, LedgerError> {
        let response = self
            .client
            .get(self.user_url(user_id, None)?)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(Self::map_transport)?;
        let response = Self::check_status(response).await?;

        let profile: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;

        credits_from_profile(&profile)
    }

    async fn set_balance(&self, user_id: &UserId, balance: i64) -> Result<(), LedgerError> {
        let body = json!({ "public_metadata": { "credits": balance } });
        let response = self
            .client
            .patch(self.user_url(user_id, Some("metadata"))?)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(response).await?;

        tracing::debug!(user_id = %user_id, balance, "Credit balance written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ledger(server: &MockServer) -> ProfileStoreCreditLedger {
        ProfileStoreCreditLedger::new(ProfileStoreConfig::new(
            server.uri(),
            Secret::new("sk_test".to_string()),
        ))
        .unwrap()
    }

    fn user() -> UserId {
        UserId::new("user_2abc").unwrap()
    }

    #[test]
    fn credits_parsing_accepts_numbers_and_numeric_strings() {
        assert_eq!(
            credits_from_profile(&json!({"public_metadata": {"credits": 5}})).unwrap(),
            5
        );
        assert_eq!(
            credits_from_profile(&json!({"public_metadata": {"credits": "7"}})).unwrap(),
            7
        );
        assert_eq!(credits_from_profile(&json!({"public_metadata": {}})).unwrap(), 0);
        assert_eq!(credits_from_profile(&json!({})).unwrap(), 0);
        assert!(credits_from_profile(&json!({"public_metadata": {"credits": []}})).is_err());
    }

    #[tokio::test]
    async fn reads_balance_from_public_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/user_2abc"))
            .and(header("authorization", "Bearer sk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user_2abc",
                "public_metadata": { "credits": 5, "plan": "trial" }
            })))
            .mount(&server)
            .await;

        assert_eq!(ledger(&server).balance(&user()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn writes_balance_as_metadata_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/user_2abc/metadata"))
            .and(body_json(json!({ "public_metadata": { "credits": 4 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        ledger(&server).set_balance(&user(), 4).await.unwrap();
    }

    #[tokio::test]
    async fn user_id_is_encoded_as_a_single_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/team%2Fmember%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_metadata": { "credits": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let odd = UserId::new("team/member?x").unwrap();
        assert_eq!(ledger(&server).balance(&odd).await.unwrap(), 2);
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let ledger = ProfileStoreCreditLedger::new(ProfileStoreConfig::new(
            "https://profiles.example/v1/",
            Secret::new("sk_test".to_string()),
        ))
        .unwrap();
        assert_eq!(
            ledger.user_url(&user(), Some("metadata")).unwrap().as_str(),
            "https://profiles.example/v1/users/user_2abc/metadata"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = ProfileStoreCreditLedger::new(ProfileStoreConfig::new(
            "not a url",
            Secret::new("sk_test".to_string()),
        ));
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(matches!(
            ledger(&server).balance(&user()).await,
            Err(LedgerError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn client_errors_are_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(matches!(
            ledger(&server).balance(&user()).await,
            Err(LedgerError::Rejected(_))
        ));
    }
}
