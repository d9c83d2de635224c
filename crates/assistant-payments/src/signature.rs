//! Webhook Signature Verification
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac-sha256>[,v1=...]`, where the
//! MAC covers `"<t>.<raw body>"` keyed by the webhook secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum clock skew between signing and receipt
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Verify a signature header against the raw payload
pub fn verify_signature(payload: &str, header: &str, secret: &str, now: DateTime<Utc>) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::WebhookSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::WebhookSignature("missing v1 signature".into()));
    }

    let skew = now.timestamp().abs_diff(timestamp);
    if skew > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(timestamp, skew, "Webhook timestamp outside tolerance");
        return Err(PaymentError::WebhookSignature("timestamp outside tolerance".into()));
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        mac_for(secret, &signed_payload)
            .is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(PaymentError::WebhookSignature("signature mismatch".into()))
    }
}

/// Compute the hex signature for `payload` at `timestamp`
pub fn compute_signature(payload: &str, secret: &str, timestamp: i64) -> Result<String> {
    let mac = mac_for(secret, &format!("{timestamp}.{payload}"))?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn mac_for(secret: &str, signed_payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Config("invalid webhook secret".into()))?;
    mac.update(signed_payload.as_bytes());
    Ok(mac)
}
