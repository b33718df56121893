use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use super::{InfraError, config::AppCheckConfig};
use crate::app_error::{AppError, AppResult};

/// Header carrying the app attestation token.
pub const APP_CHECK_HEADER: &str = "x-app-check";

/// Verifies app attestation tokens (RS256) issued for genuine app builds.
pub struct AppCheckVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl AppCheckVerifier {
    pub fn new(config: &AppCheckConfig) -> Result<Self, InfraError> {
        let key = DecodingKey::from_rsa_pem(config.public_key_pem.as_bytes()).map_err(|source| {
            InfraError::InvalidKey {
                var: "APP_CHECK_PUBLIC_KEY_PEM",
                source,
            }
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        match &config.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    /// Returns `FailedPrecondition` for missing, malformed, expired or
    /// foreign tokens.
    pub fn verify(&self, token: Option<&str>) -> AppResult<()> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(invalid_attestation)?;

        decode::<serde_json::Value>(token, &self.key, &self.validation)
            .map(|_| ())
            .map_err(|e| {
                tracing::warn!(error = %e, "App attestation rejected");
                invalid_attestation()
            })
    }
}

fn invalid_attestation() -> AppError {
    AppError::FailedPrecondition("app attestation invalid".into())
}
