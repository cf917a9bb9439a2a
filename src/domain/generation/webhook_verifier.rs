//! Provider webhook signature verification.
//!
//! When a shared secret is configured the provider signs each callback with
//! HMAC-SHA256 over `"{timestamp}.{body}"` and sends the result in the
//! `X-Webhook-Signature` header as `t=<unix>,v1=<hex>`. The timestamp window
//! keeps captured callbacks from being replayed later.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Default maximum age of a signed callback (5 minutes).
const DEFAULT_MAX_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for callbacks stamped in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a callback signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSignatureError {
    #[error("signature header missing")]
    MissingHeader,

    #[error("malformed signature header: {0}")]
    ParseError(String),

    #[error("signature mismatch")]
    InvalidSignature,

    #[error("callback timestamp is too old")]
    TimestampOutOfRange,

    #[error("callback timestamp is in the future")]
    InvalidTimestamp,
}

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>`. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookSignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or_else(|| {
                WebhookSignatureError::ParseError("invalid header format".to_string())
            })?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookSignatureError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookSignatureError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookSignatureError::ParseError("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| WebhookSignatureError::ParseError("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Verifies provider callbacks against a shared secret.
pub struct WebhookVerifier {
    secret: Secret<String>,
    max_age_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self {
            secret,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    /// Overrides the replay window.
    pub fn with_max_age_secs(mut self, secs: i64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Checks the header against the raw body.
    ///
    /// `header` is `None` when the request carried no signature at all.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), WebhookSignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), WebhookSignatureError> {
        let header = header.ok_or(WebhookSignatureError::MissingHeader)?;
        let header = SignatureHeader::parse(header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected = sign(self.secret.expose_secret().as_bytes(), header.timestamp, payload)?;
        if !constant_time_compare(&expected, &header.v1_signature) {
            return Err(WebhookSignatureError::InvalidSignature);
        }
        Ok(())
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookSignatureError> {
        let age = now
            .checked_sub(timestamp)
            .ok_or(WebhookSignatureError::InvalidTimestamp)?;
        if age > self.max_age_secs {
            return Err(WebhookSignatureError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookSignatureError::InvalidTimestamp);
        }
        Ok(())
    }
}

fn sign(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| WebhookSignatureError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a valid `X-Webhook-Signature` value for `payload`.
///
/// Used by senders and test fixtures.
pub fn compute_signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = sign(secret.as_bytes(), timestamp, payload).unwrap_or_default();
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_generation_test";
    const NOW: i64 = 1_760_000_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(Secret::new(TEST_SECRET.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // Header Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_reads_timestamp_and_signature() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64))).unwrap();
        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let raw = format!("t=1234567890, v1={}, v2=future", "a".repeat(64));
        assert!(SignatureHeader::parse(&raw).is_ok());
    }

    #[test]
    fn parse_header_rejects_missing_parts() {
        assert!(matches!(
            SignatureHeader::parse("t=1234567890"),
            Err(WebhookSignatureError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse(&format!("v1={}", "a".repeat(64))),
            Err(WebhookSignatureError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=1,v1=zz"),
            Err(WebhookSignatureError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"task_id":"t1","status":"completed","result":"https://cdn/x.png"}"#;
        let header = compute_signature_header(TEST_SECRET, NOW, body);
        assert_eq!(verifier().verify_at(body, Some(&header), NOW), Ok(()));
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(
            verifier().verify_at(b"{}", None, NOW),
            Err(WebhookSignatureError::MissingHeader)
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let header = compute_signature_header(TEST_SECRET, NOW, br#"{"task_id":"t1"}"#);
        assert_eq!(
            verifier().verify_at(br#"{"task_id":"t2"}"#, Some(&header), NOW),
            Err(WebhookSignatureError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = compute_signature_header("other-secret", NOW, b"{}");
        assert_eq!(
            verifier().verify_at(b"{}", Some(&header), NOW),
            Err(WebhookSignatureError::InvalidSignature)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Replay Window
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_timestamp_at_window_boundary() {
        let header = compute_signature_header(TEST_SECRET, NOW - 300, b"{}");
        assert!(verifier().verify_at(b"{}", Some(&header), NOW).is_ok());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = compute_signature_header(TEST_SECRET, NOW - 301, b"{}");
        assert_eq!(
            verifier().verify_at(b"{}", Some(&header), NOW),
            Err(WebhookSignatureError::TimestampOutOfRange)
        );
    }

    #[test]
    fn custom_window_is_honored() {
        let header = compute_signature_header(TEST_SECRET, NOW - 100, b"{}");
        let strict = verifier().with_max_age_secs(30);
        assert_eq!(
            strict.verify_at(b"{}", Some(&header), NOW),
            Err(WebhookSignatureError::TimestampOutOfRange)
        );
    }

    #[test]
    fn rejects_timestamp_beyond_clock_skew() {
        let header = compute_signature_header(TEST_SECRET, NOW + 120, b"{}");
        assert_eq!(
            verifier().verify_at(b"{}", Some(&header), NOW),
            Err(WebhookSignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        assert_eq!(
            verifier().verify_at(b"{}", Some("t=-9223372036854775808,v1=00"), NOW),
            Err(WebhookSignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verifier().verify_at(b"{}", Some("t=9223372036854775807,v1=00"), NOW),
            Err(WebhookSignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verifier().verify(b"{}", Some("t=-9223372036854775808,v1=00")),
            Err(WebhookSignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn verify_uses_wall_clock() {
        let now = chrono::Utc::now().timestamp();
        let header = compute_signature_header(TEST_SECRET, now, b"{}");
        assert!(verifier().verify(b"{}", Some(&header)).is_ok());
    }
}
