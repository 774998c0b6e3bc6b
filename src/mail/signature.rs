//! Verification of Standard-Webhooks signatures on the auth email hook.
//!
//! The signed content is `{webhook-id}.{webhook-timestamp}.{body}`, the MAC is
//! HMAC-SHA256 keyed with the base64 part of a `v1,whsec_...` secret, and the
//! `webhook-signature` header carries one or more space-separated `v1,<mac>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

const TOLERANCE_SECS: i64 = 5 * 60;

/// The three signature headers of one delivery.
#[derive(Debug, Clone, Copy)]
pub struct SignedDelivery<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signatures: &'a str,
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::InvalidSignature(reason.into())
}

pub fn decode_secret(secret: &str) -> Result<Vec<u8>, AppError> {
    let raw = secret.trim();
    let raw = raw.strip_prefix("v1,").unwrap_or(raw);
    let raw = raw.strip_prefix("whsec_").unwrap_or(raw);
    STANDARD.decode(raw).map_err(|e| invalid(format!("malformed hook secret: {e}")))
}

fn mac_for(key: &[u8], delivery: &SignedDelivery<'_>, body: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| invalid(e.to_string()))?;
    mac.update(delivery.id.as_bytes());
    mac.update(b".");
    mac.update(delivery.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Checks the timestamp window and that at least one `v1` signature matches.
pub fn verify(
    key: &[u8],
    delivery: &SignedDelivery<'_>,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let sent_at: i64 = delivery
        .timestamp
        .trim()
        .parse()
        .map_err(|_| invalid("malformed webhook-timestamp"))?;
    if (now.timestamp() - sent_at).abs() > TOLERANCE_SECS {
        return Err(invalid("webhook-timestamp outside tolerance"));
    }

    let mac = mac_for(key, delivery, body)?;
    let matched = delivery
        .signatures
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|encoded| STANDARD.decode(encoded).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err(invalid("no matching signature"))
    }
}

/// Produces the `v1,<base64>` header value for a delivery.
pub fn sign(key: &[u8], delivery_id: &str, timestamp: &str, body: &[u8]) -> Result<String, AppError> {
    let delivery = SignedDelivery { id: delivery_id, timestamp, signatures: "" };
    let tag = mac_for(key, &delivery, body)?.finalize().into_bytes();
    Ok(format!("v1,{}", STANDARD.encode(tag)))
}
