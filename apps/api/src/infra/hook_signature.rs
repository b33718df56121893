use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature of a system-invoked hook.
pub const HOOK_SIGNATURE_HEADER: &str = "x-hook-signature";

/// Maximum age (and future skew) of a signed hook request.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Produces `t=<unix>,v1=<hex>` over `"<t>.<body>"`.
pub fn sign_hook_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let signature = hex::encode(mac_for(secret, timestamp, body).finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

/// Verifies a hook signature header against the raw body.
///
/// Comparison is constant-time. Every failure maps to `Unauthenticated`.
pub fn verify_hook_signature(secret: &str, header: &str, body: &[u8], now: i64) -> AppResult<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::Unauthenticated)?;
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(timestamp, now, "Hook signature outside tolerance window");
        return Err(AppError::Unauthenticated);
    }

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac_for(secret, timestamp, body).verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        tracing::warn!("Hook signature mismatch");
        return Err(AppError::Unauthenticated);
    }
    Ok(())
}
