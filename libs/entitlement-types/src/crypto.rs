use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{JwtError, SessionTokenClaims};

/// Verifies a session token's signature and expiry and returns its claims.
///
/// # Arguments
/// * `token` - The JWT token string
/// * `secret` - The HS256 signing secret shared with the entitlement API
/// * `clock_skew_seconds` - Tolerance for clock skew (typically 60 seconds)
///
/// # Security Note
/// Offline verification cannot observe revocation. A token that passes here
/// may already have been revoked by a later login on another device; call the
/// API when the decision must reflect the current session binding.
pub fn verify_session_token(
    token: &str,
    secret: &str,
    clock_skew_seconds: u64,
) -> Result<SessionTokenClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = clock_skew_seconds;

    let token_data = decode::<SessionTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}
