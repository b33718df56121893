use entitlement_types::{EntitlementClaims, JwtError, SessionTokenClaims, verify_session_token};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use time::{Duration, OffsetDateTime};

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::account::AccountId;

/// Clock skew tolerated when verifying session tokens.
const CLOCK_SKEW_SECS: u64 = 30;

/// Issue a session token embedding the account's current entitlement claims.
pub fn issue(
    account_id: &AccountId,
    epoch: &str,
    entitlements: EntitlementClaims,
    secret: &SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let exp = now + ttl.whole_seconds();
    let claims = SessionTokenClaims {
        sub: account_id.to_string(),
        epoch: epoch.to_string(),
        entitlements,
        iat: now,
        exp,
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verify signature and expiry. Revocation is checked by the credential
/// authority against the account's current epoch.
pub fn verify(token: &str, secret: &SecretString) -> AppResult<SessionTokenClaims> {
    verify_session_token(token, secret.expose_secret(), CLOCK_SKEW_SECS).map_err(|e| {
        match e {
            JwtError::Expired => tracing::debug!("Session token expired"),
            other => tracing::debug!(error = %other, "Session token rejected"),
        }
        AppError::Unauthenticated
    })
}
