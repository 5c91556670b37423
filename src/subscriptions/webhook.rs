//! HMAC-SHA256 verification of payment webhooks.
//!
//! The processor sends `Stripe-Signature: t=<unix seconds>,v1=<hex mac>[,v1=...]`
//! where each mac is computed over `{t}.{raw body}` with the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age (and clock skew) accepted for a signed payload
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature timestamp outside the {0}s tolerance")]
    TimestampOutOfTolerance(i64),

    #[error("No signature matched the payload")]
    SignatureMismatch,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Parsed `t=...,v1=...` header
#[derive(Debug, PartialEq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(WebhookError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?);
            }
            // Undecodable entries can never match; skip them rather than fail
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            // Other schemes (v0 test signatures) are ignored
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(timestamp: i64, payload: &str, secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Some(mac)
}

/// Build a signature header for `payload`, as the processor would
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Option<String> {
    let signature = mac_for(timestamp, payload, secret)?.finalize().into_bytes();
    Some(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

/// Verify a signature header against the raw body.
///
/// Succeeds when any `v1` entry matches and the timestamp is within
/// `tolerance_secs` of `now`.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let header = parse_header(header)?;

    // t is untrusted until a MAC matches
    if now.abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(WebhookError::TimestampOutOfTolerance(tolerance_secs));
    }

    let matched = header.signatures.iter().any(|signature| {
        // verify_slice compares in constant time
        mac_for(header.timestamp, payload, secret)
            .is_some_and(|mac| mac.verify_slice(signature).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Payment processor event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: Option<i64>,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &str) -> Result<Self, WebhookError> {
        serde_json::from_str(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"customer.subscription.updated","data":{"object":{}}}"#;
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn test_sign_and_verify() {
        let header = sign_payload(PAYLOAD, SECRET, NOW).unwrap();
        assert!(header.starts_with(&format!("t={},v1=", NOW)));

        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW, 300), Ok(()));
        // Within tolerance either side
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW + 300, 300), Ok(()));
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW - 300, 300), Ok(()));

        assert_eq!(
            verify_signature("tampered", &header, SECRET, NOW, 300),
            Err(WebhookError::SignatureMismatch)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &header, "whsec_other", NOW, 300),
            Err(WebhookError::SignatureMismatch)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW + 301, 300),
            Err(WebhookError::TimestampOutOfTolerance(300))
        );
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let valid = sign_payload(PAYLOAD, SECRET, NOW).unwrap();
        let valid_sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={},v0=ignored", NOW, "00".repeat(32), valid_sig);
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW, 300), Ok(()));
    }

    #[test]
    fn test_extreme_timestamps_are_out_of_tolerance() {
        let zeros = "00".repeat(32);
        for t in [i64::MIN, i64::MAX, NOW - i64::MAX] {
            let header = format!("t={},v1={}", t, zeros);
            assert_eq!(
                verify_signature(PAYLOAD, &header, SECRET, NOW, 300),
                Err(WebhookError::TimestampOutOfTolerance(300)),
                "t: {}",
                t
            );
        }

        // A correctly signed payload is still refused when far in the past
        let header = sign_payload(PAYLOAD, SECRET, i64::MIN).unwrap();
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW, 300),
            Err(WebhookError::TimestampOutOfTolerance(300))
        );
    }

    #[test]
    fn test_malformed_headers() {
        let no_signature = format!("t={}", NOW);
        for header in ["", "t=abc,v1=00", "v1=00", no_signature.as_str(), "garbage"] {
            assert_eq!(
                verify_signature(PAYLOAD, header, SECRET, NOW, 300),
                Err(WebhookError::MalformedHeader),
                "header: {:?}",
                header
            );
        }
    }

    #[test]
    fn test_parse_event() {
        let event = WebhookEvent::parse(PAYLOAD).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "customer.subscription.updated");
        assert!(matches!(
            WebhookEvent::parse("{"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
